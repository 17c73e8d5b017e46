//! Resolution behaviour against the in-memory store

use std::sync::Arc;

use permres::{
    Decision, EntitiesGroupId, EntityKey, GroupId, KeyExtractors, MemoryStore, PermError, Permission, PermissionId,
    PermissionResolver, Scope, Subject, Target, UserId,
};

const U: UserId = UserId(1);
const G: GroupId = GroupId(10);

fn perm(id: u64, subject: Subject, scope: Scope, op: &str, level: i32, allow: bool) -> Permission {
    Permission::with_id(PermissionId(id), subject, scope, op, level, allow).unwrap()
}

fn ids(perms: &[Permission]) -> Vec<u64> {
    perms.iter().map(|p| p.id.0).collect()
}

fn setup() -> (Arc<MemoryStore>, PermissionResolver) {
    let store = Arc::new(MemoryStore::new());
    store.add_user_to_group(U, G).unwrap();
    let resolver = PermissionResolver::with_backend(store.clone());
    (store, resolver)
}

#[test]
fn test_user_group_scenario() {
    let (store, r) = setup();
    store.put(perm(1, Subject::Group(G), Scope::Global, "/Doc", 1, true)).unwrap();
    store.put(perm(2, Subject::User(U), Scope::Global, "/Doc/Delete", 2, false)).unwrap();

    let got = r.resolve(&Subject::User(U), &["/Doc/Delete"], Target::Global).unwrap();
    assert_eq!(ids(&got), vec![2, 1]);
    assert_eq!(Decision::from_ordered(&got), Decision::Denied(PermissionId(2)));

    // A sibling operation only inherits the group grant
    assert!(r.is_allowed(&Subject::User(U), &["/Doc/Read"], Target::Global).unwrap());
}

#[test]
fn test_empty_store_returns_empty() {
    let (_store, r) = setup();
    let got = r.resolve(&Subject::User(U), &["/Anything"], Target::Entity(EntityKey(3))).unwrap();
    assert!(got.is_empty());
    assert_eq!(r.decide(&Subject::User(U), &["/Anything"], Target::Global).unwrap(), Decision::NoRule);
    assert!(!r.is_allowed(&Subject::User(U), &["/Anything"], Target::Global).unwrap());
}

#[test]
fn test_higher_level_wins_regardless_of_allow() {
    let (store, r) = setup();
    store.put(perm(1, Subject::User(U), Scope::Global, "/A", 5, true)).unwrap();
    store.put(perm(2, Subject::User(U), Scope::Global, "/A", 10, false)).unwrap();
    let got = r.resolve(&Subject::User(U), &["/A"], Target::Global).unwrap();
    assert_eq!(ids(&got), vec![2, 1]);

    store.put(perm(3, Subject::Group(G), Scope::Global, "/A", 20, true)).unwrap();
    assert!(r.is_allowed(&Subject::User(U), &["/A"], Target::Global).unwrap());
}

#[test]
fn test_deny_first_at_equal_level() {
    let (store, r) = setup();
    store.put(perm(1, Subject::User(U), Scope::Global, "/A", 3, true)).unwrap();
    store.put(perm(2, Subject::Group(G), Scope::Global, "/A", 3, false)).unwrap();
    let got = r.resolve(&Subject::User(U), &["/A"], Target::Global).unwrap();
    assert_eq!(ids(&got), vec![2, 1]);
}

#[test]
fn test_global_and_entity_visibility() {
    let (store, r) = setup();
    let x = EntityKey(100);
    let y = EntityKey(200);
    store.put(perm(1, Subject::User(U), Scope::Global, "/Acc", 1, true)).unwrap();
    store.put(perm(2, Subject::User(U), Scope::Entity(x), "/Acc", 2, false)).unwrap();

    let u = Subject::User(U);
    assert_eq!(ids(&r.resolve(&u, &["/Acc"], Target::Global).unwrap()), vec![1]);
    assert_eq!(ids(&r.resolve(&u, &["/Acc"], Target::Entity(x)).unwrap()), vec![2, 1]);
    assert_eq!(ids(&r.resolve(&u, &["/Acc"], Target::Entity(y)).unwrap()), vec![1]);
}

#[test]
fn test_entities_group_scope() {
    let (store, r) = setup();
    let eg = EntitiesGroupId(7);
    store.add_entity_to_group(EntityKey(5), eg).unwrap();
    store.put(perm(1, Subject::Group(G), Scope::EntitiesGroup(eg), "/Acc/Edit", 4, true)).unwrap();

    let u = Subject::User(U);
    assert!(r.is_allowed(&u, &["/Acc/Edit"], Target::Entity(EntityKey(5))).unwrap());
    assert!(!r.is_allowed(&u, &["/Acc/Edit"], Target::Entity(EntityKey(6))).unwrap());
    assert!(!r.is_allowed(&u, &["/Acc/Edit"], Target::Global).unwrap());
}

#[test]
fn test_other_users_records_ignored() {
    let (store, r) = setup();
    store.put(perm(1, Subject::User(UserId(2)), Scope::Global, "/A", 9, true)).unwrap();
    store.put(perm(2, Subject::Group(GroupId(99)), Scope::Global, "/A", 9, true)).unwrap();
    assert!(r.resolve(&Subject::User(U), &["/A"], Target::Global).unwrap().is_empty());
}

#[test]
fn test_nested_group_closure() {
    let (store, r) = setup();
    store.add_group_to_group(G, GroupId(20)).unwrap();
    store.put(perm(1, Subject::Group(GroupId(20)), Scope::Global, "/A", 1, true)).unwrap();
    assert!(r.is_allowed(&Subject::User(U), &["/A/B/C"], Target::Global).unwrap());
}

#[test]
fn test_repeatable() {
    let (store, r) = setup();
    for i in 0..20u64 {
        let allow = i % 3 == 0;
        let level = (i % 4) as i32;
        store.put(perm(i + 1, Subject::User(U), Scope::Global, "/A", level, allow)).unwrap();
    }
    let first = r.resolve(&Subject::User(U), &["/A"], Target::Global).unwrap();
    let second = r.resolve(&Subject::User(U), &["/A"], Target::Global).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 20);
}

#[test]
fn test_multiple_operations() {
    let (store, r) = setup();
    store.put(perm(1, Subject::User(U), Scope::Global, "/A", 1, true)).unwrap();
    store.put(perm(2, Subject::User(U), Scope::Global, "/B", 2, true)).unwrap();
    store.put(perm(3, Subject::User(U), Scope::Global, "/C", 3, true)).unwrap();
    let got = r.resolve(&Subject::User(U), &["/A/x", "/B/y"], Target::Global).unwrap();
    assert_eq!(ids(&got), vec![2, 1]);
}

struct Invoice {
    key: u64,
}

struct Untracked;

#[test]
fn test_resolve_for_resource() {
    let (store, r) = setup();
    let mut ex = KeyExtractors::new();
    ex.register(|i: &Invoice| EntityKey(i.key));
    let r = r.with_extractors(ex);
    store.put(perm(1, Subject::User(U), Scope::Entity(EntityKey(42)), "/Invoice/Pay", 1, true)).unwrap();

    let got = r.resolve_for(&Subject::User(U), &["/Invoice/Pay"], &Invoice { key: 42 }).unwrap();
    assert_eq!(ids(&got), vec![1]);

    match r.resolve_for(&Subject::User(U), &["/Invoice/Pay"], &Untracked) {
        Err(PermError::UnsupportedEntityType(name)) => assert!(name.contains("Untracked")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_invalid_arguments() {
    let (_store, r) = setup();
    let none: [&str; 0] = [];
    assert!(matches!(r.resolve(&Subject::User(U), &none, Target::Global), Err(PermError::InvalidArgument(_))));
    assert!(matches!(r.resolve(&Subject::User(U), &["Doc"], Target::Global), Err(PermError::InvalidArgument(_))));
    assert!(matches!(
        r.resolve(&Subject::Group(GroupId(0)), &["/Doc"], Target::Global),
        Err(PermError::InvalidArgument(_))
    ));
}

// ============================================================================
// Listing queries
// ============================================================================

#[test]
fn test_permissions_for_user() {
    let (store, r) = setup();
    store.put(perm(1, Subject::User(U), Scope::Entity(EntityKey(1)), "/A", 1, true)).unwrap();
    store.put(perm(2, Subject::Group(G), Scope::Global, "/B", 2, true)).unwrap();
    store.put(perm(3, Subject::User(UserId(2)), Scope::Global, "/A", 3, true)).unwrap();
    assert_eq!(ids(&r.permissions_for_user(U).unwrap()), vec![2, 1]);
}

#[test]
fn test_permissions_for_operations() {
    let (store, r) = setup();
    store.put(perm(1, Subject::User(UserId(2)), Scope::Global, "/A", 1, true)).unwrap();
    store.put(perm(2, Subject::Group(G), Scope::Entity(EntityKey(1)), "/A/B", 1, false)).unwrap();
    store.put(perm(3, Subject::User(U), Scope::Global, "/C", 1, true)).unwrap();
    assert_eq!(ids(&r.permissions_for_operations(&["/A/B"]).unwrap()), vec![2, 1]);
}

#[test]
fn test_permissions_on_entity_excludes_global() {
    let (store, r) = setup();
    let eg = EntitiesGroupId(3);
    store.add_entity_to_group(EntityKey(9), eg).unwrap();
    store.put(perm(1, Subject::User(U), Scope::Global, "/A", 1, true)).unwrap();
    store.put(perm(2, Subject::User(U), Scope::Entity(EntityKey(9)), "/A", 1, true)).unwrap();
    store.put(perm(3, Subject::Group(G), Scope::EntitiesGroup(eg), "/Z", 5, true)).unwrap();
    store.put(perm(4, Subject::User(UserId(2)), Scope::Entity(EntityKey(9)), "/A", 1, true)).unwrap();

    assert_eq!(ids(&r.permissions_on_entity(U, EntityKey(9)).unwrap()), vec![3, 2]);
    assert_eq!(ids(&r.permissions_for_entity(EntityKey(9)).unwrap()), vec![3, 2, 4]);
}

#[test]
fn test_permissions_for_group() {
    let (store, r) = setup();
    store.put(perm(1, Subject::Group(G), Scope::Global, "/A", 1, true)).unwrap();
    store.put(perm(2, Subject::Group(G), Scope::Entity(EntityKey(1)), "/A/B", 2, true)).unwrap();
    store.put(perm(3, Subject::User(U), Scope::Global, "/A", 3, true)).unwrap();
    assert_eq!(ids(&r.permissions_for_group(G, "/A/B").unwrap()), vec![2, 1]);
}

#[test]
fn test_group_nesting_past_limit_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    store.add_user_to_group(U, GroupId(1)).unwrap();
    for i in 1..13u64 {
        store.add_group_to_group(GroupId(i), GroupId(i + 1)).unwrap();
    }
    store.put(perm(1, Subject::User(U), Scope::Global, "/Doc", 1, true)).unwrap();
    store.put(perm(2, Subject::Group(GroupId(13)), Scope::Global, "/Doc", 100, false)).unwrap();
    let r = PermissionResolver::with_backend(store);

    let u = Subject::User(U);
    assert!(matches!(r.resolve(&u, &["/Doc"], Target::Global), Err(PermError::CollaboratorUnavailable(_))));
    assert!(r.is_allowed(&u, &["/Doc"], Target::Global).is_err());
}
