mod helpers;

use helpers::{for_each_backend, signup};
use neurolinker::storage::types::{
    ChatEntry, ChatFilter, DecisionInput, Preferences, PreferencesUpdate, RecordId,
};

fn titled(title: &str) -> DecisionInput {
    DecisionInput {
        title: Some(title.into()),
        description: Some(format!("{title} description")),
        ..Default::default()
    }
}

#[test]
fn signup_rejects_duplicate_email() {
    for_each_backend(|name, s| {
        assert!(s.create_user("a@x.com", "pw1", "A").unwrap(), "{name}");
        assert!(!s.create_user("a@x.com", "pw2", "A again").unwrap(), "{name}");

        assert!(s.authenticate_user("a@x.com", "pw1").unwrap().is_some(), "{name}");
        assert!(s.authenticate_user("a@x.com", "pw2").unwrap().is_none(), "{name}");
        assert!(s.authenticate_user("nobody@x.com", "pw1").unwrap().is_none(), "{name}");
    });
}

#[test]
fn user_lookup_never_exposes_the_hash() {
    for_each_backend(|name, s| {
        let id = signup(s, "b@x.com");
        let user = s.get_user(&id).unwrap().unwrap();
        assert_eq!(user.email, "b@x.com", "{name}");
        assert_eq!(user.full_name, "Test User", "{name}");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"), "{name}: {json}");

        assert_eq!(s.get_user_by_email("b@x.com").unwrap().unwrap().id, id, "{name}");
        assert!(s.get_user(&RecordId::from("missing")).unwrap().is_none(), "{name}");
    });
}

#[test]
fn password_change_takes_effect() {
    for_each_backend(|name, s| {
        let id = signup(s, "c@x.com");
        assert!(s.update_user_password(&id, "new-secret").unwrap(), "{name}");
        assert!(s.authenticate_user("c@x.com", "secret").unwrap().is_none(), "{name}");
        assert_eq!(s.authenticate_user("c@x.com", "new-secret").unwrap(), Some(id), "{name}");
        assert!(!s.update_user_password(&RecordId::Seq(999), "x").unwrap(), "{name}");
    });
}

#[test]
fn saving_with_the_same_id_is_an_upsert() {
    for_each_backend(|name, s| {
        let owner = signup(s, "d@x.com");
        let id = s.save_decision(&owner, &titled("First")).unwrap();
        let created = s.get_decision(&owner, &id).unwrap().unwrap().created_at;

        let mut update = titled("First, revised");
        update.id = Some(id.clone());
        update.outcome_status = Some("completed".into());
        assert_eq!(s.save_decision(&owner, &update).unwrap(), id, "{name}");
        assert_eq!(s.save_decision(&owner, &update).unwrap(), id, "{name}");

        let all = s.get_user_decisions(&owner, None).unwrap();
        assert_eq!(all.len(), 1, "{name}");
        assert_eq!(all[0].title.as_deref(), Some("First, revised"), "{name}");
        assert_eq!(all[0].outcome_status, "completed", "{name}");
        assert_eq!(all[0].created_at, created, "{name}: created_at must survive overwrites");
    });
}

#[test]
fn new_decisions_get_defaults() {
    for_each_backend(|name, s| {
        let owner = signup(s, "e@x.com");
        let id = s.save_decision(&owner, &DecisionInput::default()).unwrap();
        let d = s.get_decision(&owner, &id).unwrap().unwrap();
        assert_eq!(d.memory_layer, "private", "{name}");
        assert_eq!(d.outcome_status, "pending", "{name}");
        assert!(d.constraints.is_empty(), "{name}");
        assert_eq!(d.user_id, owner, "{name}");
    });
}

#[test]
fn owners_are_isolated() {
    for_each_backend(|name, s| {
        let alice = signup(s, "alice@x.com");
        let bob = signup(s, "bob@x.com");
        let id = s.save_decision(&alice, &titled("Alice's")).unwrap();

        assert!(s.get_decision(&bob, &id).unwrap().is_none(), "{name}");
        assert!(!s.delete_decision(&bob, &id).unwrap(), "{name}");
        assert!(s.get_user_decisions(&bob, None).unwrap().is_empty(), "{name}");

        // Bob reusing Alice's id gets a record of his own.
        let mut hijack = titled("Bob's");
        hijack.id = Some(id.clone());
        let bobs_id = s.save_decision(&bob, &hijack).unwrap();
        assert_ne!(bobs_id, id, "{name}");
        let alices = s.get_decision(&alice, &id).unwrap().unwrap();
        assert_eq!(alices.title.as_deref(), Some("Alice's"), "{name}");
    });
}

#[test]
fn decisions_come_back_newest_first_and_limited() {
    for_each_backend(|name, s| {
        let owner = signup(s, "f@x.com");
        for title in ["one", "two", "three"] {
            s.save_decision(&owner, &titled(title)).unwrap();
        }

        let titles: Vec<String> = s
            .get_user_decisions(&owner, None)
            .unwrap()
            .into_iter()
            .filter_map(|d| d.title)
            .collect();
        assert_eq!(titles, vec!["three", "two", "one"], "{name}");

        assert_eq!(s.get_user_decisions(&owner, Some(2)).unwrap().len(), 2, "{name}");
        assert!(s.get_user_decisions(&owner, Some(0)).unwrap().is_empty(), "{name}");
    });
}

#[test]
fn delete_removes_only_that_decision() {
    for_each_backend(|name, s| {
        let owner = signup(s, "g@x.com");
        let keep = s.save_decision(&owner, &titled("keep")).unwrap();
        let drop = s.save_decision(&owner, &titled("drop")).unwrap();

        assert!(s.delete_decision(&owner, &drop).unwrap(), "{name}");
        assert!(!s.delete_decision(&owner, &drop).unwrap(), "{name}");
        assert!(s.get_decision(&owner, &keep).unwrap().is_some(), "{name}");
        assert_eq!(s.get_user_decisions(&owner, None).unwrap().len(), 1, "{name}");
    });
}

#[test]
fn chat_history_is_chronological_and_filters_hidden() {
    for_each_backend(|name, s| {
        let owner = signup(s, "h@x.com");
        s.save_chat_message(&owner, &ChatEntry::new("q1", "a1")).unwrap();
        s.save_chat_message(&owner, &ChatEntry::new("q2", "a2").hidden()).unwrap();
        s.save_chat_message(&owner, &ChatEntry::new("q3", "a3").chat_type("suggestion"))
            .unwrap();

        let visible = s.get_chat_history(&owner, &ChatFilter::default()).unwrap();
        let questions: Vec<&str> = visible.iter().map(|c| c.user_message.as_str()).collect();
        assert_eq!(questions, vec!["q1", "q3"], "{name}");

        let everything = s
            .get_chat_history(&owner, &ChatFilter { include_hidden: true, ..Default::default() })
            .unwrap();
        assert_eq!(everything.len(), 3, "{name}");
        assert!(!everything[1].is_visible_to_user, "{name}");

        let suggestions = s
            .get_chat_history(
                &owner,
                &ChatFilter { chat_type: Some("suggestion".into()), ..Default::default() },
            )
            .unwrap();
        assert_eq!(suggestions.len(), 1, "{name}");
        assert_eq!(suggestions[0].ai_response, "a3", "{name}");
    });
}

#[test]
fn chat_for_decision_includes_hidden_and_excludes_others() {
    for_each_backend(|name, s| {
        let owner = signup(s, "i@x.com");
        let other = signup(s, "j@x.com");
        s.save_chat_message(&owner, &ChatEntry::new("unlinked", "a")).unwrap();
        s.save_chat_message(&owner, &ChatEntry::new("linked", "a").linked_to("d1").hidden())
            .unwrap();
        s.save_chat_message(&other, &ChatEntry::new("someone else", "a").linked_to("d1"))
            .unwrap();

        let trail = s.get_chat_history_for_decision(&owner, "d1").unwrap();
        assert_eq!(trail.len(), 1, "{name}");
        assert_eq!(trail[0].user_message, "linked", "{name}");
        assert_eq!(trail[0].decision_id.as_deref(), Some("d1"), "{name}");
    });
}

#[test]
fn preferences_default_and_merge() {
    for_each_backend(|name, s| {
        let owner = signup(s, "k@x.com");
        assert_eq!(s.get_user_preferences(&owner).unwrap(), Preferences::default(), "{name}");

        let update = PreferencesUpdate { share_data_with_ai: Some(true), view_chat_history: None };
        assert!(s.update_user_preferences(&owner, &update).unwrap(), "{name}");
        let prefs = s.get_user_preferences(&owner).unwrap();
        assert!(prefs.share_data_with_ai, "{name}");
        assert!(prefs.view_chat_history, "{name}");

        let update = PreferencesUpdate { share_data_with_ai: None, view_chat_history: Some(false) };
        s.update_user_preferences(&owner, &update).unwrap();
        let prefs = s.get_user_preferences(&owner).unwrap();
        assert!(prefs.share_data_with_ai, "{name}");
        assert!(!prefs.view_chat_history, "{name}");
    });
}

#[test]
fn preferences_for_unknown_user_are_defaults() {
    for_each_backend(|name, s| {
        let prefs = s.get_user_preferences(&RecordId::from("nobody")).unwrap();
        assert_eq!(prefs, Preferences::default(), "{name}");
    });
}
