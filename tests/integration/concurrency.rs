use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use treefs::config::{BackoffConfig, StoreConfig, TreeFsConfig};
use treefs::{FileSystem, NodeKind};

const DEADLINE: Duration = Duration::from_secs(30);

fn shared_fs(inode_table_size: usize) -> Arc<FileSystem> {
    Arc::new(FileSystem::new(&TreeFsConfig {
        store: StoreConfig {
            inode_table_size,
            max_dir_entries: 20,
        },
        backoff: BackoffConfig {
            spin_retries: 2,
            base_delay_us: 10,
            max_delay_us: 500,
        },
        ..TreeFsConfig::default()
    }))
}

/// Run `work` on `threads` threads and fail if they do not all finish in time.
fn run_bounded<F>(threads: usize, work: F)
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let (done_tx, done_rx) = mpsc::channel();
    for worker in 0..threads {
        let work = Arc::clone(&work);
        let done_tx = done_tx.clone();
        thread::spawn(move || {
            work(worker);
            done_tx.send(worker).unwrap();
        });
    }
    for _ in 0..threads {
        done_rx
            .recv_timeout(DEADLINE)
            .expect("workers did not finish: possible deadlock");
    }
}

/// Every node reachable from the root exactly once, and nothing else allocated.
fn assert_tree_consistent(fs: &FileSystem) {
    let tree = fs.snapshot();
    let mut seen = HashSet::new();
    let mut stack = vec![&tree];
    while let Some(node) = stack.pop() {
        assert!(seen.insert(node.id), "node {} linked twice", node.id);
        stack.extend(node.children.iter());
    }
    assert_eq!(seen.len(), fs.store().allocated_count());
}

#[test]
fn overlapping_moves_finish() {
    let fs = shared_fs(64);
    for dir in ["/a", "/b", "/c", "/a/x", "/b/y", "/c/z"] {
        fs.create(dir, NodeKind::Directory).unwrap();
    }

    let moves = [
        ("/a/x", "/b/x"),
        ("/b/x", "/a/x"),
        ("/b/y", "/c/y"),
        ("/c/y", "/b/y"),
        ("/c/z", "/a/z"),
        ("/a/z", "/c/z"),
        ("/a", "/b/y/a"),
        ("/b/y/a", "/a"),
    ];

    let worker_fs = Arc::clone(&fs);
    run_bounded(8, move |worker| {
        for round in 0..200 {
            let (src, dst) = moves[(worker + round) % moves.len()];
            let _ = worker_fs.move_node(src, dst);
            let _ = worker_fs.lookup(dst);
        }
    });

    assert_tree_consistent(&fs);
    assert_eq!(fs.store().allocated_count(), 7);
}

#[test]
fn crossing_directory_moves_never_form_a_cycle() {
    let fs = shared_fs(16);
    fs.create("/p", NodeKind::Directory).unwrap();
    fs.create("/q", NodeKind::Directory).unwrap();

    let worker_fs = Arc::clone(&fs);
    run_bounded(4, move |worker| {
        for _ in 0..300 {
            // Two movers each try to put one directory inside the other.
            let result = if worker % 2 == 0 {
                worker_fs
                    .move_node("/p", "/q/p")
                    .and_then(|_| worker_fs.move_node("/q/p", "/p"))
            } else {
                worker_fs
                    .move_node("/q", "/p/q")
                    .and_then(|_| worker_fs.move_node("/p/q", "/q"))
            };
            let _ = result;
        }
    });

    assert_tree_consistent(&fs);
    assert_eq!(fs.store().allocated_count(), 3);
}

#[test]
fn concurrent_creates_get_distinct_ids() {
    let fs = shared_fs(50);
    for dir in ["/t0", "/t1", "/t2", "/t3"] {
        fs.create(dir, NodeKind::Directory).unwrap();
    }

    let (ids_tx, ids_rx) = mpsc::channel();
    let worker_fs = Arc::clone(&fs);
    run_bounded(4, move |worker| {
        for i in 0..10 {
            let id = worker_fs
                .create(&format!("/t{}/f{}", worker, i), NodeKind::File)
                .unwrap();
            ids_tx.send(id).unwrap();
        }
    });

    let ids: Vec<_> = ids_rx.try_iter().collect();
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(ids.len(), 40);
    assert_eq!(unique.len(), 40);
    assert_tree_consistent(&fs);
}

#[test]
fn mixed_operations_keep_tree_consistent() {
    let fs = shared_fs(40);
    fs.create("/shared", NodeKind::Directory).unwrap();

    let worker_fs = Arc::clone(&fs);
    run_bounded(6, move |worker| {
        let own = format!("/w{}", worker);
        let _ = worker_fs.create(&own, NodeKind::Directory);
        for round in 0..150 {
            let name = format!("n{}", round % 3);
            let mine = format!("{}/{}", own, name);
            let theirs = format!("/shared/{}-{}", worker, name);
            match round % 5 {
                0 => {
                    let _ = worker_fs.create(&mine, NodeKind::File);
                }
                1 => {
                    let _ = worker_fs.move_node(&mine, &theirs);
                }
                2 => {
                    let _ = worker_fs.lookup(&theirs);
                }
                3 => {
                    let _ = worker_fs.move_node(&theirs, &mine);
                }
                _ => {
                    let _ = worker_fs.delete(&mine);
                    let _ = worker_fs.snapshot();
                }
            }
        }
    });

    assert_tree_consistent(&fs);
}
