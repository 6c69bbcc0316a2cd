use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::Entity;
use crate::domain::ids::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: UserId,
  pub username: String,
  pub display_name: String,
  #[serde(default)]
  pub avatar_url: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
  pub username: String,
  pub display_name: String,
  #[serde(default)]
  pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
  pub display_name: Option<String>,
  pub avatar_url: Option<String>,
}

impl Entity for User {
  type Id = UserId;
  type Draft = UserDraft;
  type Patch = UserPatch;

  const KIND: &'static str = "user";

  fn id(&self) -> UserId {
    self.id
  }

  fn from_draft(draft: UserDraft, created_at: DateTime<Utc>) -> Self {
    User {
      id: UserId::new(),
      username: draft.username,
      display_name: draft.display_name,
      avatar_url: draft.avatar_url,
      created_at,
    }
  }

  fn apply(&mut self, patch: UserPatch) {
    if let Some(name) = patch.display_name {
      self.display_name = name;
    }
    if let Some(url) = patch.avatar_url {
      self.avatar_url = Some(url);
    }
  }
}
