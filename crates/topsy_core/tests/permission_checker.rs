use std::sync::Arc;
use topsy_core::{
    Board, MemoryStorage, Permission, PermissionChecker, PermissionSet, Role, SqliteStorage,
    Storage, User,
};

fn checker_with_roles(storage: Arc<dyn Storage>) -> (PermissionChecker<dyn Storage>, i64) {
    let owner = storage
        .create_user(&User::new("owner@x.com", "Owner"), "pw")
        .unwrap()
        .id
        .unwrap();
    let board_id = storage
        .save_board_with_owner(&Board::new("Team"), owner)
        .unwrap()
        .id
        .unwrap();
    for (email, role) in [("editor@x.com", Role::Editor), ("reader@x.com", Role::Reader)] {
        let user_id = storage
            .create_user(&User::new(email, "Member"), "pw")
            .unwrap()
            .id
            .unwrap();
        storage.save_board_user(board_id, user_id, role).unwrap();
    }
    (PermissionChecker::new(storage), board_id)
}

#[test]
fn check_expands_each_role_on_both_backends() {
    for storage in [
        Arc::new(MemoryStorage::new()) as Arc<dyn Storage>,
        Arc::new(SqliteStorage::open_in_memory().unwrap()) as Arc<dyn Storage>,
    ] {
        let (checker, board_id) = checker_with_roles(storage);

        assert_eq!(checker.check(1, board_id).unwrap(), PermissionSet::for_role(Role::Owner));
        assert_eq!(checker.check(2, board_id).unwrap(), PermissionSet::for_role(Role::Editor));
        assert_eq!(checker.check(3, board_id).unwrap(), PermissionSet::for_role(Role::Reader));
    }
}

#[test]
fn non_member_has_no_permissions() {
    let (checker, board_id) = checker_with_roles(Arc::new(MemoryStorage::new()));
    assert!(checker.check(42, board_id).unwrap().is_empty());
    assert!(checker.check(1, board_id + 1).unwrap().is_empty());
    assert!(!checker.has_permission(42, board_id, Permission::ViewNotes).unwrap());
}

#[test]
fn has_permission_follows_role_table() {
    let (checker, board_id) = checker_with_roles(Arc::new(MemoryStorage::new()));

    assert!(checker.has_permission(1, board_id, Permission::Delete).unwrap());
    assert!(checker.has_permission(2, board_id, Permission::EditNote).unwrap());
    assert!(!checker.has_permission(2, board_id, Permission::AddUser).unwrap());
    assert!(checker.has_permission(3, board_id, Permission::ViewNotes).unwrap());
    assert!(!checker.has_permission(3, board_id, Permission::AddNote).unwrap());
}

#[test]
fn permissions_change_with_role() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let (checker, board_id) = checker_with_roles(Arc::clone(&storage));

    storage.save_board_user(board_id, 3, Role::Editor).unwrap();
    assert!(checker.has_permission(3, board_id, Permission::EditNote).unwrap());

    storage.delete_board_user(board_id, 3).unwrap();
    assert!(checker.check(3, board_id).unwrap().is_empty());
}
