use proptest::prelude::*;
use std::collections::HashSet;
use treefs::command::Command;
use treefs::config::{StoreConfig, TreeFsConfig};
use treefs::{FileSystem, FsError, NodeKind};

fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 1..4)
        .prop_map(|parts| format!("/{}", parts.join("/")))
}

fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        (path_strategy(), any::<bool>()).prop_map(|(path, dir)| Command::Create {
            path,
            kind: if dir {
                NodeKind::Directory
            } else {
                NodeKind::File
            },
        }),
        path_strategy().prop_map(|path| Command::Delete { path }),
        path_strategy().prop_map(|path| Command::Lookup { path }),
        (path_strategy(), path_strategy()).prop_map(|(src, dst)| Command::Move { src, dst }),
    ]
}

fn small_fs() -> FileSystem {
    FileSystem::new(&TreeFsConfig {
        store: StoreConfig {
            inode_table_size: 12,
            max_dir_entries: 3,
        },
        ..TreeFsConfig::default()
    })
}

fn apply(fs: &FileSystem, command: &Command) -> Result<(), FsError> {
    match command {
        Command::Create { path, kind } => fs.create(path, *kind).map(|_| ()),
        Command::Delete { path } => fs.delete(path),
        Command::Lookup { path } => fs.lookup(path).map(|_| ()),
        Command::Move { src, dst } => fs.move_node(src, dst),
        Command::Print { .. } => Ok(()),
    }
}

proptest! {
    #[test]
    fn every_allocated_node_has_one_parent(commands in prop::collection::vec(command_strategy(), 1..60)) {
        let fs = small_fs();
        for command in &commands {
            let _ = apply(&fs, command);

            let tree = fs.snapshot();
            let mut seen = HashSet::new();
            let mut stack = vec![&tree];
            while let Some(node) = stack.pop() {
                prop_assert!(seen.insert(node.id));
                if node.kind == NodeKind::File {
                    prop_assert!(node.children.is_empty());
                }
                stack.extend(node.children.iter());
            }
            prop_assert_eq!(seen.len(), fs.store().allocated_count());
        }
    }

    #[test]
    fn successful_operations_are_observable(commands in prop::collection::vec(command_strategy(), 1..60)) {
        let fs = small_fs();
        for command in &commands {
            let result = apply(&fs, command);
            match (command, result) {
                (Command::Create { path, .. }, Ok(())) => {
                    let first = fs.lookup(path);
                    prop_assert!(first.is_ok());
                    prop_assert_eq!(fs.lookup(path), first);
                }
                (Command::Delete { path }, Ok(())) => {
                    prop_assert_eq!(fs.lookup(path), Err(FsError::NotFound));
                }
                (Command::Move { src, dst }, Ok(())) => {
                    prop_assert!(fs.lookup(dst).is_ok());
                    prop_assert!(fs.lookup(src).is_err());
                }
                _ => {}
            }
        }
    }
}
