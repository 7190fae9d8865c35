//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use chrono::Utc;
use cv_core::{
    Comment, MemoryCache, MockThreadApi, MockUserApi, ReadThroughCache, Session, Thread, User,
    VoteSets,
};

use crate::notice::Notices;
use crate::session::SessionHandle;
use crate::Services;

pub fn ids(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

pub fn thread(id: &str, up: &[&str], down: &[&str]) -> Thread {
    Thread {
        id: id.into(),
        title: format!("title {id}"),
        content: "content".into(),
        author_id: "author".into(),
        author_name: None,
        author_username: None,
        author_avatar_url: None,
        comments: vec![],
        votes: VoteSets::new(ids(up), ids(down)),
        tags: vec![],
        file: None,
        created_at: Utc::now(),
    }
}

pub fn comment(id: &str, user_id: &str) -> Comment {
    Comment {
        comment_id: id.into(),
        user_id: user_id.into(),
        content: "reply".into(),
        votes: VoteSets::default(),
        created_at: Utc::now(),
        user_name: None,
        avatar_url: None,
        name: None,
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.into(),
        name: name.into(),
        username: name.to_lowercase(),
        email: format!("{}@campus.edu", name.to_lowercase()),
        bio: None,
        avatar_url: None,
    }
}

pub fn memory_cache() -> ReadThroughCache {
    ReadThroughCache::new(Arc::new(MemoryCache::new()))
}

pub fn services(threads: MockThreadApi, users: MockUserApi) -> Services {
    let services = Services::new(Arc::new(threads), Arc::new(users), memory_cache());
    services.session.set(Some(Session::new("tok", Some("u1".into()))));
    services
}

pub fn logged_out(threads: MockThreadApi, users: MockUserApi) -> Services {
    Services {
        session: SessionHandle::new(),
        notices: Notices::default(),
        ..Services::new(Arc::new(threads), Arc::new(users), memory_cache())
    }
}
