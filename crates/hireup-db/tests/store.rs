use chrono::Duration;

use hireup_db::{Database, StoreError};
use hireup_types::models::{AccountType, Permission};

fn fixture() -> (Database, i64, i64) {
    let db = Database::open_in_memory().unwrap();
    let alice = db
        .create_user("alice", "Alice", "Archer", AccountType::User)
        .unwrap();
    let bob = db
        .create_user("bob", "Bob", "Baker", AccountType::Recruiter)
        .unwrap();
    (db, alice, bob)
}

#[test]
fn send_is_durable_before_any_push() {
    let (db, alice, bob) = fixture();
    let created = db.create_conversation(alice, bob, "hi").unwrap();

    // The recipient's next fetch must already include the message, with
    // no dependence on live delivery.
    let data = db.get_conversation(bob, &created.conversation_slug).unwrap();
    assert_eq!(data.conversation.messages.len(), 1);
    assert_eq!(data.conversation.messages[0].content, "hi");
    assert_eq!(data.conversation.messages[0].sender.slug, "alice");
    assert!(!data.conversation.messages[0].read);
}

#[test]
fn create_conversation_assigns_roles() {
    let (db, alice, bob) = fixture();
    let created = db.create_conversation(alice, bob, "hello").unwrap();

    assert_eq!(created.conversation.permission, Permission::Owner);
    assert_eq!(created.conversation.participant.user.slug, "bob");
    assert_eq!(created.recipient_slug, "bob");
    assert!(created.conversation.read);

    let bob_view = db.get_conversation(bob, &created.conversation_slug).unwrap();
    assert_eq!(bob_view.conversation.permission, Permission::Participant);
    assert_eq!(bob_view.conversation.participant.user.slug, "alice");
    assert_eq!(bob_view.conversation.participants.len(), 2);
}

#[test]
fn unread_count_matches_unread_foreign_messages() {
    let (db, alice, bob) = fixture();
    let created = db.create_conversation(alice, bob, "one").unwrap();
    let conv = created.conversation.id;

    db.send_message(alice, conv, "two", None).unwrap();
    db.send_message(alice, conv, "three", None).unwrap();
    db.send_message(bob, conv, "reply", None).unwrap();

    assert_eq!(db.unread_count(bob, conv).unwrap(), 3);
    assert_eq!(db.unread_count(alice, conv).unwrap(), 1);

    db.mark_read(bob, &created.conversation_slug).unwrap();
    assert_eq!(db.unread_count(bob, conv).unwrap(), 0);
    // Bob reading never touches what Alice has unread.
    assert_eq!(db.unread_count(alice, conv).unwrap(), 1);
}

#[test]
fn mark_read_is_idempotent() {
    let (db, alice, bob) = fixture();
    let created = db.create_conversation(alice, bob, "hi").unwrap();
    let conv = created.conversation.id;
    db.send_message(alice, conv, "again", None).unwrap();

    db.mark_read(bob, &created.conversation_slug).unwrap();
    assert_eq!(db.unread_count(bob, conv).unwrap(), 0);

    db.mark_read(bob, &created.conversation_slug).unwrap();
    assert_eq!(db.unread_count(bob, conv).unwrap(), 0);
}

#[test]
fn read_flag_folds_into_list_shape() {
    let (db, alice, bob) = fixture();
    let created = db.create_conversation(alice, bob, "hi").unwrap();

    let bob_list = db.list_conversations(bob).unwrap();
    assert_eq!(bob_list.len(), 1);
    assert!(!bob_list[0].read);

    db.mark_read(bob, &created.conversation_slug).unwrap();
    let bob_list = db.list_conversations(bob).unwrap();
    assert!(bob_list[0].read);

    // The sender was never unread.
    let alice_list = db.list_conversations(alice).unwrap();
    assert!(alice_list[0].read);
}

#[test]
fn archive_is_scoped_to_the_archiving_participant() {
    let (db, alice, bob) = fixture();
    let created = db.create_conversation(alice, bob, "hi").unwrap();
    let conv = created.conversation.id;

    db.archive_conversation(alice, conv).unwrap();

    assert!(db.list_conversations(alice).unwrap().is_empty());
    assert_eq!(db.list_conversations(bob).unwrap().len(), 1);

    let alice_archived = db.list_archived_conversations(alice).unwrap();
    assert_eq!(alice_archived.len(), 1);
    assert!(db.list_archived_conversations(bob).unwrap().is_empty());

    let restored = db.unarchive_conversation(alice, conv).unwrap();
    assert_eq!(restored.id, conv);
    assert_eq!(db.list_conversations(alice).unwrap().len(), 1);
}

#[test]
fn archive_requires_membership() {
    let (db, alice, bob) = fixture();
    let eve = db
        .create_user("eve", "Eve", "Edwards", AccountType::User)
        .unwrap();
    let created = db.create_conversation(alice, bob, "hi").unwrap();

    let err = db
        .archive_conversation(eve, created.conversation.id)
        .unwrap_err();
    assert!(matches!(err, StoreError::PermissionNotFound));
}

#[test]
fn reply_must_reference_message_in_same_conversation() {
    let (db, alice, bob) = fixture();
    let first = db.create_conversation(alice, bob, "hi").unwrap();
    let other = db.create_conversation(bob, alice, "elsewhere").unwrap();

    // Unknown target.
    let err = db
        .send_message(alice, first.conversation.id, "re", Some(9999))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidReply));

    // Target lives in a different conversation.
    let err = db
        .send_message(alice, first.conversation.id, "re", Some(other.message.id))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidReply));

    // A real earlier message works and attaches a preview.
    let sent = db
        .send_message(bob, first.conversation.id, "re", Some(first.message.id))
        .unwrap();
    let reply = sent.message.reply.expect("reply preview");
    assert_eq!(reply.id, first.message.id);
    assert_eq!(reply.content, "hi");
}

#[test]
fn blank_content_is_rejected_before_any_write() {
    let (db, alice, bob) = fixture();
    let created = db.create_conversation(alice, bob, "hi").unwrap();

    let err = db
        .send_message(alice, created.conversation.id, "   ", None)
        .unwrap_err();
    assert!(matches!(err, StoreError::EmptyContent));
    assert!(matches!(
        db.create_conversation(alice, bob, "").unwrap_err(),
        StoreError::EmptyContent
    ));

    // Nothing was inserted.
    let data = db.get_conversation(alice, &created.conversation_slug).unwrap();
    assert_eq!(data.conversation.messages.len(), 1);
}

#[test]
fn sender_membership_is_enforced() {
    let (db, alice, bob) = fixture();
    let eve = db
        .create_user("eve", "Eve", "Edwards", AccountType::User)
        .unwrap();
    let created = db.create_conversation(alice, bob, "hi").unwrap();

    let err = db
        .send_message(eve, created.conversation.id, "intrude", None)
        .unwrap_err();
    assert!(matches!(err, StoreError::PermissionNotFound));

    let err = db.send_message(alice, 9999, "void", None).unwrap_err();
    assert!(matches!(err, StoreError::ConversationNotFound));
}

#[test]
fn soft_deleted_content_is_never_returned() {
    let (db, alice, bob) = fixture();
    let created = db.create_conversation(alice, bob, "first").unwrap();
    let conv = created.conversation.id;
    let sent = db.send_message(alice, conv, "secret", None).unwrap();

    db.delete_message(alice, sent.message.id).unwrap();

    let data = db.get_conversation(bob, &created.conversation_slug).unwrap();
    let deleted = data
        .conversation
        .messages
        .iter()
        .find(|m| m.id == sent.message.id)
        .unwrap();
    assert!(deleted.deleted);
    assert_eq!(deleted.content, "");

    // The list preview falls back to the latest non-deleted message.
    let list = db.list_conversations(bob).unwrap();
    let preview = list[0].last_message.as_ref().unwrap();
    assert_eq!(preview.content, "first");
}

#[test]
fn only_the_sender_may_delete() {
    let (db, alice, bob) = fixture();
    let created = db.create_conversation(alice, bob, "hi").unwrap();

    let err = db.delete_message(bob, created.message.id).unwrap_err();
    assert!(matches!(err, StoreError::PermissionNotFound));

    let err = db.delete_message(alice, 9999).unwrap_err();
    assert!(matches!(err, StoreError::MessageNotFound));
}

#[test]
fn message_pages_are_windowed_and_chronological() {
    let (db, alice, bob) = fixture();
    let created = db.create_conversation(alice, bob, "m1").unwrap();
    let conv = created.conversation.id;
    for i in 2..=40 {
        db.send_message(alice, conv, &format!("m{i}"), None).unwrap();
    }

    let data = db.get_conversation(bob, &created.conversation_slug).unwrap();
    assert_eq!(data.conversation.messages.len(), 35);
    assert_eq!(data.next, Some(1));
    // Newest 35, re-sorted oldest-first.
    assert_eq!(data.conversation.messages.first().unwrap().content, "m6");
    assert_eq!(data.conversation.messages.last().unwrap().content, "m40");

    let older = db
        .list_messages(bob, &created.conversation_slug, 1)
        .unwrap();
    assert_eq!(older.messages.len(), 5);
    assert_eq!(older.next, None);
    assert_eq!(older.messages.first().unwrap().content, "m1");
    assert_eq!(older.messages.last().unwrap().content, "m5");
}

#[test]
fn listing_orders_by_last_activity() {
    let (db, alice, bob) = fixture();
    let first = db.create_conversation(alice, bob, "old").unwrap();
    let eve = db
        .create_user("eve", "Eve", "Edwards", AccountType::User)
        .unwrap();
    let second = db.create_conversation(alice, eve, "new").unwrap();

    let list = db.list_conversations(alice).unwrap();
    assert_eq!(list[0].id, second.conversation.id);

    // New message in the first conversation bumps it back to the top.
    db.send_message(bob, first.conversation.id, "bump", None)
        .unwrap();
    let list = db.list_conversations(alice).unwrap();
    assert_eq!(list[0].id, first.conversation.id);
    assert_eq!(list[0].last_message.as_ref().unwrap().content, "bump");
}

#[test]
fn conversation_pages_have_next_cursors() {
    let (db, alice, bob) = fixture();
    for i in 0..30 {
        db.create_conversation(alice, bob, &format!("c{i}")).unwrap();
    }

    let page0 = db.list_conversations_page(alice, 0).unwrap();
    assert_eq!(page0.conversations.len(), 25);
    assert_eq!(page0.next, Some(1));

    let page1 = db.list_conversations_page(alice, 1).unwrap();
    assert_eq!(page1.conversations.len(), 5);
    assert_eq!(page1.next, None);
}

#[test]
fn oversized_page_numbers_yield_empty_pages() {
    let (db, alice, bob) = fixture();
    let created = db.create_conversation(alice, bob, "hi").unwrap();

    // The page number is attacker-controlled; the maximum value must
    // resolve to an empty window, not an arithmetic panic.
    let page = db
        .list_messages(bob, &created.conversation_slug, u32::MAX)
        .unwrap();
    assert!(page.messages.is_empty());
    assert_eq!(page.next, None);

    let list = db.list_conversations_page(alice, u32::MAX).unwrap();
    assert!(list.conversations.is_empty());
    assert_eq!(list.next, None);
}

#[test]
fn corrupt_permission_values_surface_as_errors() {
    let (db, alice, bob) = fixture();
    db.create_conversation(alice, bob, "hi").unwrap();

    // Force a value the CHECK constraint would normally reject.
    db.with_conn(|conn| {
        conn.pragma_update(None, "ignore_check_constraints", true)?;
        conn.execute(
            "UPDATE conversation_participants SET permission = 'viewer' WHERE user_id = ?1",
            [bob],
        )?;
        conn.pragma_update(None, "ignore_check_constraints", false)?;
        Ok(())
    })
    .unwrap();

    // Alice's own row is intact; the corrupt counterpart row must fail
    // the query rather than be coerced to a default role.
    let err = db.list_conversations(alice).unwrap_err();
    assert!(matches!(err, StoreError::Db(_)));
}

#[test]
fn detail_is_hidden_from_non_participants() {
    let (db, alice, bob) = fixture();
    let eve = db
        .create_user("eve", "Eve", "Edwards", AccountType::User)
        .unwrap();
    let created = db.create_conversation(alice, bob, "hi").unwrap();

    let err = db
        .get_conversation(eve, &created.conversation_slug)
        .unwrap_err();
    assert!(matches!(err, StoreError::ConversationNotFound));

    let err = db.get_conversation(alice, "no-such-slug").unwrap_err();
    assert!(matches!(err, StoreError::ConversationNotFound));
}

#[test]
fn session_lookup_resolves_only_live_sessions() {
    let (db, alice, _bob) = fixture();

    let token = db.create_session(alice, Duration::days(30)).unwrap();
    let session = db.get_session(&token).unwrap().expect("live session");
    assert_eq!(session.user_id, alice);
    assert_eq!(session.user_slug, "alice");
    assert_eq!(session.account_type, AccountType::User);

    let expired = db.create_session(alice, Duration::seconds(-1)).unwrap();
    assert!(db.get_session(&expired).unwrap().is_none());
    assert!(db.get_session("bogus-token").unwrap().is_none());
}
