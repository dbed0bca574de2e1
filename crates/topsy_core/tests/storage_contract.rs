//! Behavior every `Storage` backend must share.

use std::sync::Arc;
use topsy_core::{
    Board, EntityKind, EntityStatus, MemoryStorage, Note, Role, SqliteStorage, Storage,
    StorageError, User,
};

fn backends() -> Vec<Arc<dyn Storage>> {
    vec![
        Arc::new(MemoryStorage::new()),
        Arc::new(SqliteStorage::open_in_memory().unwrap()),
    ]
}

fn seed_user(storage: &dyn Storage, email: &str) -> i64 {
    storage
        .create_user(&User::new(email, "Someone"), "secret")
        .unwrap()
        .id
        .unwrap()
}

#[test]
fn note_ids_follow_max_plus_one() {
    for storage in backends() {
        let ids: Vec<_> = (0..3)
            .map(|i| {
                storage
                    .save_note(&Note::new(format!("n{i}"), "body"))
                    .unwrap()
                    .id
            })
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)], "{}", storage.backend_name());

        storage.delete_note(2).unwrap();
        let next = storage.save_note(&Note::new("n4", "body")).unwrap();
        assert_eq!(next.id, Some(4), "{}", storage.backend_name());
    }
}

#[test]
fn saving_with_id_overwrites_and_keeps_created_at() {
    for storage in backends() {
        let created = storage.save_note(&Note::new("draft", "v1")).unwrap();
        assert!(created.created_at.is_some());
        assert!(created.modified_at.is_some());

        let updated = storage
            .save_note(&Note {
                body: "v2".to_string(),
                ..created.clone()
            })
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(storage.get_note(1).unwrap().body, "v2");
    }
}

#[test]
fn missing_records_are_not_found() {
    for storage in backends() {
        let name = storage.backend_name();
        assert!(
            matches!(
                storage.get_note(99),
                Err(StorageError::NotFound { entity: EntityKind::Note, id: 99 })
            ),
            "{name}"
        );
        assert!(matches!(
            storage.delete_note(99),
            Err(StorageError::NotFound { .. })
        ));
        assert!(matches!(
            storage.get_user(5),
            Err(StorageError::NotFound { entity: EntityKind::User, .. })
        ));
        assert!(matches!(
            storage.get_board(3),
            Err(StorageError::NotFound { entity: EntityKind::Board, .. })
        ));
        assert!(matches!(
            storage.delete_board_user(1, 1),
            Err(StorageError::BoardUserNotFound { board_id: 1, user_id: 1 })
        ));
        assert_eq!(storage.get_role(1, 1).unwrap(), None);
    }
}

#[test]
fn duplicate_email_is_rejected() {
    for storage in backends() {
        seed_user(storage.as_ref(), "bob@x.com");
        let err = storage
            .create_user(&User::new("bob@x.com", "Other Bob"), "pw")
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateEmail(_)), "{}", storage.backend_name());
    }
}

#[test]
fn passwords_are_verified_against_stored_hash() {
    for storage in backends() {
        let id = seed_user(storage.as_ref(), "carol@x.com");
        assert!(storage.verify_password(id, "secret").unwrap());
        assert!(!storage.verify_password(id, "Secret").unwrap());
        assert!(storage.verify_password(id + 1, "secret").is_err());

        let found = storage.find_user_by_email("carol@x.com").unwrap().unwrap();
        assert_eq!(found.id, Some(id));
        assert!(storage.find_user_by_email("nobody@x.com").unwrap().is_none());
    }
}

#[test]
fn board_user_upsert_keeps_one_record() {
    for storage in backends() {
        let user_id = seed_user(storage.as_ref(), "dan@x.com");
        let board_id = storage.save_board(&Board::new("B")).unwrap().id.unwrap();

        storage.save_board_user(board_id, user_id, Role::Reader).unwrap();
        storage.save_board_user(board_id, user_id, Role::Editor).unwrap();

        assert_eq!(storage.get_role(user_id, board_id).unwrap(), Some(Role::Editor));
        let members = storage.get_board_users(board_id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, Role::Editor);
        assert_eq!(members[0].user.id, Some(user_id));
    }
}

#[test]
fn save_board_with_owner_writes_membership() {
    for storage in backends() {
        let user_id = seed_user(storage.as_ref(), "eve@x.com");
        let board = storage
            .save_board_with_owner(&Board::new("Shared"), user_id)
            .unwrap();
        let board_id = board.id.unwrap();

        assert_eq!(storage.get_role(user_id, board_id).unwrap(), Some(Role::Owner));
        let boards = storage.get_user_boards(user_id).unwrap();
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].board.name, "Shared");
        assert_eq!(boards[0].role, Role::Owner);
    }
}

#[test]
fn deleted_board_hides_and_cascades() {
    for storage in backends() {
        let name = storage.backend_name();
        let user_id = seed_user(storage.as_ref(), "fay@x.com");
        let board_id = storage
            .save_board_with_owner(&Board::new("Doomed"), user_id)
            .unwrap()
            .id
            .unwrap();
        let on_board = storage
            .save_note(&Note {
                board_id: Some(board_id),
                ..Note::new("on board", "x")
            })
            .unwrap();
        let elsewhere = storage.save_note(&Note::new("private", "y")).unwrap();

        let deleted = storage.delete_board(board_id).unwrap();
        assert_eq!(deleted.status, EntityStatus::Deleted, "{name}");

        assert!(storage.get_board(board_id).is_err(), "{name}");
        assert!(storage.get_note(on_board.id.unwrap()).is_err(), "{name}");
        assert!(storage.get_note(elsewhere.id.unwrap()).is_ok(), "{name}");
        assert!(storage.get_board_notes(board_id).unwrap().is_empty(), "{name}");
        assert!(storage.get_board_users(board_id).unwrap().is_empty(), "{name}");
        assert_eq!(storage.get_role(user_id, board_id).unwrap(), None, "{name}");
        assert!(storage.get_user_boards(user_id).unwrap().is_empty(), "{name}");

        assert!(matches!(
            storage.delete_board(board_id),
            Err(StorageError::NotFound { .. })
        ));
    }
}

#[test]
fn board_notes_are_filtered_by_board() {
    for storage in backends() {
        let first = storage.save_board(&Board::new("one")).unwrap().id;
        let second = storage.save_board(&Board::new("two")).unwrap().id;
        for (title, board_id) in [("a", first), ("b", second), ("c", first)] {
            storage
                .save_note(&Note {
                    board_id,
                    ..Note::new(title, "")
                })
                .unwrap();
        }

        let titles: Vec<_> = storage
            .get_board_notes(first.unwrap())
            .unwrap()
            .into_iter()
            .map(|note| note.title)
            .collect();
        assert_eq!(titles, vec!["a", "c"]);
    }
}

#[test]
fn save_user_updates_profile_and_requires_existing_id() {
    for storage in backends() {
        let id = seed_user(storage.as_ref(), "gus@x.com");
        let user = storage.get_user(id).unwrap();
        let saved = storage
            .save_user(&User {
                name: "Gus Renamed".to_string(),
                ..user
            })
            .unwrap();
        assert_eq!(saved.name, "Gus Renamed");
        assert_eq!(storage.get_user(id).unwrap().name, "Gus Renamed");

        let unknown = User {
            id: Some(404),
            ..User::new("ghost@x.com", "Ghost")
        };
        assert!(matches!(
            storage.save_user(&unknown),
            Err(StorageError::NotFound { .. })
        ));
    }
}

#[test]
fn sqlite_file_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("topsy.db");

    {
        let storage = SqliteStorage::open(&path).unwrap();
        let user_id = seed_user(&storage, "hal@x.com");
        storage
            .save_board_with_owner(&Board::new("Kept"), user_id)
            .unwrap();
    }

    let reopened = SqliteStorage::open(&path).unwrap();
    let board = reopened.get_board(1).unwrap();
    assert_eq!(board.name, "Kept");
    assert_eq!(reopened.get_role(1, 1).unwrap(), Some(Role::Owner));
}

#[test]
fn sole_owner_cannot_be_demoted_or_removed() {
    for storage in backends() {
        let name = storage.backend_name();
        let owner = seed_user(storage.as_ref(), "gus@x.com");
        let other = seed_user(storage.as_ref(), "hal@x.com");
        let board_id = storage
            .save_board_with_owner(&Board::new("Solo"), owner)
            .unwrap()
            .id
            .unwrap();

        assert!(
            matches!(
                storage.save_board_user(board_id, owner, Role::Editor),
                Err(StorageError::LastOwner { .. })
            ),
            "{name}"
        );
        assert!(
            matches!(
                storage.delete_board_user(board_id, owner),
                Err(StorageError::LastOwner { .. })
            ),
            "{name}"
        );
        assert_eq!(storage.get_role(owner, board_id).unwrap(), Some(Role::Owner));

        storage.save_board_user(board_id, other, Role::Owner).unwrap();
        storage.save_board_user(board_id, owner, Role::Reader).unwrap();
        assert_eq!(storage.get_role(owner, board_id).unwrap(), Some(Role::Reader), "{name}");
        storage.delete_board_user(board_id, owner).unwrap();
    }
}

#[test]
fn create_user_rejects_existing_id() {
    for storage in backends() {
        let id = seed_user(storage.as_ref(), "ivy@x.com");
        let clash = User {
            id: Some(id),
            ..User::new("jon@x.com", "Jon")
        };

        assert!(
            matches!(
                storage.create_user(&clash, "pw"),
                Err(StorageError::ConstraintViolation(_))
            ),
            "{}",
            storage.backend_name()
        );
        assert_eq!(storage.get_user(id).unwrap().email, "ivy@x.com");
        assert!(storage.verify_password(id, "secret").unwrap());
    }
}
