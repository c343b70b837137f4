use treefs::config::{StoreConfig, TreeFsConfig};
use treefs::{FileSystem, FsError, NodeKind};

fn fs() -> FileSystem {
    FileSystem::new(&TreeFsConfig::default())
}

fn small_fs(inode_table_size: usize, max_dir_entries: usize) -> FileSystem {
    FileSystem::new(&TreeFsConfig {
        store: StoreConfig {
            inode_table_size,
            max_dir_entries,
        },
        ..TreeFsConfig::default()
    })
}

#[test]
fn create_then_lookup_nested_file() {
    let fs = fs();
    let a = fs.create("/a", NodeKind::Directory).unwrap();
    let b = fs.create("/a/b", NodeKind::File).unwrap();

    assert_ne!(a, b);
    assert_eq!(fs.lookup("/a"), Ok(a));
    assert_eq!(fs.lookup("/a/b"), Ok(b));
}

#[test]
fn duplicate_create_fails() {
    let fs = fs();
    fs.create("/a", NodeKind::Directory).unwrap();
    assert_eq!(
        fs.create("/a", NodeKind::Directory),
        Err(FsError::AlreadyExists)
    );
    assert_eq!(fs.create("/a", NodeKind::File), Err(FsError::AlreadyExists));
}

#[test]
fn delete_requires_empty_directory() {
    let fs = fs();
    fs.create("/a", NodeKind::Directory).unwrap();
    fs.create("/a/b", NodeKind::File).unwrap();

    assert_eq!(fs.delete("/a"), Err(FsError::NotEmpty));
    assert_eq!(fs.delete("/a/b"), Ok(()));
    assert_eq!(fs.delete("/a"), Ok(()));
    assert_eq!(fs.lookup("/a"), Err(FsError::NotFound));
}

#[test]
fn move_between_directories() {
    let fs = fs();
    fs.create("/a", NodeKind::Directory).unwrap();
    fs.create("/b", NodeKind::Directory).unwrap();
    let x = fs.create("/a/x", NodeKind::File).unwrap();

    assert_eq!(fs.move_node("/a/x", "/b/x"), Ok(()));
    assert_eq!(fs.lookup("/a/x"), Err(FsError::NotFound));
    assert_eq!(fs.lookup("/b/x"), Ok(x));
}

#[test]
fn move_into_own_subtree_fails() {
    let fs = fs();
    fs.create("/a", NodeKind::Directory).unwrap();
    assert_eq!(fs.move_node("/a", "/a/sub"), Err(FsError::InvalidMove));
    assert!(fs.lookup("/a").is_ok());
}

#[test]
fn create_and_delete_are_inverse() {
    let fs = fs();
    fs.create("/d", NodeKind::Directory).unwrap();
    let before = fs.snapshot();
    let allocated = fs.store().allocated_count();

    fs.create("/d/tmp", NodeKind::File).unwrap();
    fs.delete("/d/tmp").unwrap();

    assert_eq!(fs.snapshot(), before);
    assert_eq!(fs.store().allocated_count(), allocated);
}

#[test]
fn move_preserves_count_and_kind() {
    let fs = fs();
    fs.create("/src", NodeKind::Directory).unwrap();
    fs.create("/dst", NodeKind::Directory).unwrap();
    let sub = fs.create("/src/sub", NodeKind::Directory).unwrap();
    fs.create("/src/sub/leaf", NodeKind::File).unwrap();
    let count = fs.snapshot().count();

    fs.move_node("/src/sub", "/dst/renamed").unwrap();

    let tree = fs.snapshot();
    assert_eq!(tree.count(), count);
    let dst = tree.children.iter().find(|c| c.name == "dst").unwrap();
    let moved = &dst.children[0];
    assert_eq!(moved.id, sub);
    assert_eq!(moved.kind, NodeKind::Directory);
    assert_eq!(moved.children[0].name, "leaf");
}

#[test]
fn freed_inodes_are_reused() {
    let fs = small_fs(3, 4);
    assert_eq!(fs.store().capacity(), 3);
    assert_eq!(fs.store().dir_capacity(), 4);
    fs.create("/a", NodeKind::File).unwrap();
    let b = fs.create("/b", NodeKind::File).unwrap();
    assert_eq!(fs.create("/c", NodeKind::File), Err(FsError::TableFull));

    fs.delete("/b").unwrap();
    assert_eq!(fs.create("/c", NodeKind::File), Ok(b));
}

#[test]
fn full_directory_rejects_create() {
    let fs = small_fs(10, 2);
    fs.create("/a", NodeKind::File).unwrap();
    fs.create("/b", NodeKind::File).unwrap();
    assert_eq!(fs.create("/c", NodeKind::File), Err(FsError::NoFreeSlot));
    // The failed create must not leak an inode.
    assert_eq!(fs.store().allocated_count(), 3);
}

#[test]
fn traversal_through_file_fails() {
    let fs = fs();
    fs.create("/f", NodeKind::File).unwrap();
    assert_eq!(fs.lookup("/f/x"), Err(FsError::NotADirectory));
    assert_eq!(fs.create("/f/x", NodeKind::File), Err(FsError::NotADirectory));
}

#[test]
fn root_cannot_be_deleted_or_moved() {
    let fs = fs();
    fs.create("/a", NodeKind::Directory).unwrap();
    assert!(fs.delete("/").is_err());
    assert_eq!(fs.move_node("/", "/a/root"), Err(FsError::InvalidMove));
}

#[test]
fn deep_chain_stops_at_path_limit() {
    let fs = fs();
    let mut path = String::new();
    for level in 0..24 {
        path.push_str(&format!("/d{}", level));
        fs.create(&path, NodeKind::Directory).unwrap();
    }
    assert!(path.len() <= treefs::types::MAX_PATH_LEN);
    assert!(fs.lookup(&path).is_ok());

    for level in 24..27 {
        path.push_str(&format!("/d{}", level));
    }
    assert!(path.len() > treefs::types::MAX_PATH_LEN);
    assert_eq!(fs.create(&path, NodeKind::Directory), Err(FsError::InvalidPath));
}
