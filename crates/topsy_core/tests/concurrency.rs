use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;
use topsy_core::{
    Board, MemoryStorage, Note, Role, SqliteStorage, Storage, StorageError, User,
};

const THREADS: usize = 8;
const WRITES_PER_THREAD: usize = 25;
const OWNER_ROUNDS: usize = 20;

fn hammer(storage: Arc<dyn Storage>) {
    let handles: Vec<_> = (0..THREADS)
        .map(|worker| {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                let mut ids = Vec::with_capacity(WRITES_PER_THREAD * 2);
                for i in 0..WRITES_PER_THREAD {
                    let note = storage
                        .save_note(&Note::new(format!("w{worker}-{i}"), ""))
                        .unwrap();
                    let board = storage
                        .save_board(&Board::new(format!("w{worker}-{i}")))
                        .unwrap();
                    ids.push((note.id.unwrap(), board.id.unwrap()));
                }
                ids
            })
        })
        .collect();

    let mut note_ids = BTreeSet::new();
    let mut board_ids = BTreeSet::new();
    for handle in handles {
        for (note_id, board_id) in handle.join().unwrap() {
            assert!(note_ids.insert(note_id), "duplicate note id {note_id}");
            assert!(board_ids.insert(board_id), "duplicate board id {board_id}");
        }
    }

    let total = (THREADS * WRITES_PER_THREAD) as i64;
    assert_eq!(note_ids, (1..=total).collect::<BTreeSet<_>>());
    assert_eq!(board_ids, (1..=total).collect::<BTreeSet<_>>());
}

#[test]
fn concurrent_memory_writes_get_unique_ids() {
    hammer(Arc::new(MemoryStorage::new()));
}

#[test]
fn concurrent_sqlite_writes_get_unique_ids() {
    let dir = tempfile::tempdir().unwrap();
    hammer(Arc::new(SqliteStorage::open(dir.path().join("threads.db")).unwrap()));
}

fn remove_co_owners_at_once(storage: Arc<dyn Storage>) {
    let owners: Vec<i64> = ["ann@x.com", "ben@x.com"]
        .into_iter()
        .map(|email| {
            storage
                .create_user(&User::new(email, "Owner"), "pw")
                .unwrap()
                .id
                .unwrap()
        })
        .collect();

    for round in 0..OWNER_ROUNDS {
        let board_id = storage
            .save_board_with_owner(&Board::new(format!("r{round}")), owners[0])
            .unwrap()
            .id
            .unwrap();
        storage.save_board_user(board_id, owners[1], Role::Owner).unwrap();

        let barrier = Arc::new(Barrier::new(owners.len()));
        let handles: Vec<_> = owners
            .iter()
            .map(|&user_id| {
                let storage = Arc::clone(&storage);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    storage.delete_board_user(board_id, user_id)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "round {round}");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(StorageError::LastOwner { .. }))));
        let remaining = storage.get_board_users(board_id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].role, Role::Owner);
    }
}

#[test]
fn concurrent_memory_owner_removals_keep_one_owner() {
    remove_co_owners_at_once(Arc::new(MemoryStorage::new()));
}

#[test]
fn concurrent_sqlite_owner_removals_keep_one_owner() {
    let dir = tempfile::tempdir().unwrap();
    remove_co_owners_at_once(Arc::new(
        SqliteStorage::open(dir.path().join("owners.db")).unwrap(),
    ));
}
