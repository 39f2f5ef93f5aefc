//! Directory realization of a tree: every node is a directory and child
//! `i` is the subdirectory named [`folder_name`]`(i)`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    ctr::{Ctr, NodeId},
    error::{Error, Result},
};

const ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Name of the `index`-th child: `a`..`z`, then one leading `z` per
/// further 26 children (`za`, `zb`, ..., `zza`). Lexicographic order of the
/// names is index order.
pub fn folder_name(index: usize) -> String {
    let base = ALPHABET.len();
    let prefix = index / base;
    let mut name = "z".repeat(prefix);
    name.push(char::from(ALPHABET[index % base]));
    name
}

/// Inverse of [`folder_name`].
pub fn folder_index(name: &str) -> Option<usize> {
    let (&last, prefix) = name.as_bytes().split_last()?;
    if !prefix.iter().all(|&b| b == b'z') {
        return None;
    }
    let last = ALPHABET.iter().position(|&b| b == last)?;
    Some(prefix.len() * ALPHABET.len() + last)
}

/// Writes the tree under `root` to `dir`, replacing whatever is there.
pub fn write(ctr: &Ctr, root: NodeId, dir: &Path) -> Result<()> {
    if dir.exists() {
        debug!("removing previous tree at {}", dir.display());
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;

    let mut stack = vec![(root, dir.to_path_buf())];
    while let Some((node, path)) = stack.pop() {
        for (i, &child) in ctr.children_of(node).iter().enumerate() {
            let child_path = path.join(folder_name(i));
            fs::create_dir(&child_path)?;
            stack.push((child, child_path));
        }
    }

    info!(
        "wrote {} folders to {}",
        ctr.descendants(root),
        dir.display()
    );
    Ok(())
}

/// Loads the tree stored at `dir`.
pub fn read(dir: &Path) -> Result<(Ctr, NodeId)> {
    let mut ctr = Ctr::new();
    let root = ctr.new_node();

    let mut stack = vec![(root, dir.to_path_buf())];
    while let Some((node, path)) = stack.pop() {
        for child_path in read_children(&path)? {
            let child = ctr.push_child(node);
            stack.push((child, child_path));
        }
    }

    debug!("read {} nodes from {}", ctr.len(), dir.display());
    Ok((ctr, root))
}

/// Counts the directories below `dir`.
pub fn count_folders(dir: &Path) -> Result<usize> {
    let mut count = 0;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(path) = stack.pop() {
        let children = read_children(&path)?;
        count += children.len();
        stack.extend(children);
    }
    Ok(count)
}

fn read_children(path: &Path) -> Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name();
        let index = name
            .to_str()
            .and_then(folder_index)
            .ok_or_else(|| malformed(path, format!("unexpected entry {name:?}")))?;
        if !entry.file_type()?.is_dir() {
            return Err(malformed(path, format!("{name:?} is not a directory")));
        }
        children.push((index, entry.path()));
    }

    children.sort_by_key(|(index, _)| *index);
    for (expected, (index, _)) in children.iter().enumerate() {
        if *index != expected {
            return Err(malformed(
                path,
                format!("missing child '{}'", folder_name(expected)),
            ));
        }
    }

    Ok(children.into_iter().map(|(_, path)| path).collect())
}

fn malformed(path: &Path, message: String) -> Error {
    Error::MalformedStore(path.to_path_buf(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_names() {
        assert_eq!(folder_name(0), "a");
        assert_eq!(folder_name(25), "z");
        assert_eq!(folder_name(26), "za");
        assert_eq!(folder_name(51), "zz");
        assert_eq!(folder_name(52), "zza");
    }

    #[test]
    fn folder_names_sort_in_index_order() {
        let names: Vec<String> = (0..100).map(folder_name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn folder_index_inverts_folder_name() {
        for i in 0..200 {
            assert_eq!(folder_index(&folder_name(i)), Some(i));
        }
        assert_eq!(folder_index(""), None);
        assert_eq!(folder_index("ab"), None);
        assert_eq!(folder_index("A"), None);
    }
}
