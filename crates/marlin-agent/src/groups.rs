// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory cache of group metadata.
//!
//! Populated from group-metadata events and membership deltas; consulted by
//! commands and the router without a transport round trip.

use std::collections::HashMap;

use marlin_core::types::{GroupAction, GroupMetadata, GroupParticipant};
use tokio::sync::RwLock;
use tracing::debug;

/// Chat-id keyed map of the latest known group metadata.
pub struct GroupCache {
    groups: RwLock<HashMap<String, GroupMetadata>>,
}

impl GroupCache {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the cached metadata for one group.
    pub async fn update(&self, metadata: GroupMetadata) {
        debug!(group = %metadata.id, subject = %metadata.subject, "group metadata cached");
        self.groups.write().await.insert(metadata.id.clone(), metadata);
    }

    pub async fn get(&self, group_id: &str) -> Option<GroupMetadata> {
        self.groups.read().await.get(group_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.groups.read().await.len()
    }

    /// Apply a membership delta to cached metadata, if present.
    ///
    /// Unknown groups are left untouched; the router refreshes them from
    /// the transport instead.
    pub async fn apply_participants(
        &self,
        group_id: &str,
        participant_ids: &[String],
        action: GroupAction,
    ) {
        let mut groups = self.groups.write().await;
        let Some(metadata) = groups.get_mut(group_id) else {
            return;
        };

        match action {
            GroupAction::Add => {
                for id in participant_ids {
                    if !metadata.participants.iter().any(|p| &p.id == id) {
                        metadata.participants.push(GroupParticipant {
                            id: id.clone(),
                            is_admin: false,
                        });
                    }
                }
            }
            GroupAction::Remove => {
                metadata
                    .participants
                    .retain(|p| !participant_ids.contains(&p.id));
            }
            GroupAction::Promote | GroupAction::Demote => {
                let promote = action == GroupAction::Promote;
                for participant in metadata.participants.iter_mut() {
                    if participant_ids.contains(&participant.id) {
                        participant.is_admin = promote;
                    }
                }
            }
        }
    }
}

impl Default for GroupCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(id: &str) -> GroupMetadata {
        GroupMetadata {
            id: id.to_string(),
            subject: "The Group".to_string(),
            owner: Some("owner@s.whatsapp.net".to_string()),
            participants: vec![
                GroupParticipant {
                    id: "a".to_string(),
                    is_admin: true,
                },
                GroupParticipant {
                    id: "b".to_string(),
                    is_admin: false,
                },
            ],
        }
    }

    #[tokio::test]
    async fn update_and_get() {
        let cache = GroupCache::new();
        cache.update(metadata("g1@g.us")).await;
        let got = cache.get("g1@g.us").await.unwrap();
        assert_eq!(got.subject, "The Group");
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("missing@g.us").await.is_none());
    }

    #[tokio::test]
    async fn add_and_remove_participants() {
        let cache = GroupCache::new();
        cache.update(metadata("g1@g.us")).await;

        cache
            .apply_participants("g1@g.us", &["c".to_string()], GroupAction::Add)
            .await;
        assert_eq!(cache.get("g1@g.us").await.unwrap().participants.len(), 3);

        // Adding an existing member is a no-op.
        cache
            .apply_participants("g1@g.us", &["c".to_string()], GroupAction::Add)
            .await;
        assert_eq!(cache.get("g1@g.us").await.unwrap().participants.len(), 3);

        cache
            .apply_participants("g1@g.us", &["b".to_string(), "c".to_string()], GroupAction::Remove)
            .await;
        let got = cache.get("g1@g.us").await.unwrap();
        assert_eq!(got.participants.len(), 1);
        assert_eq!(got.participants[0].id, "a");
    }

    #[tokio::test]
    async fn promote_and_demote_flip_admin_flag() {
        let cache = GroupCache::new();
        cache.update(metadata("g1@g.us")).await;

        cache
            .apply_participants("g1@g.us", &["b".to_string()], GroupAction::Promote)
            .await;
        let got = cache.get("g1@g.us").await.unwrap();
        assert!(got.participants.iter().find(|p| p.id == "b").unwrap().is_admin);

        cache
            .apply_participants("g1@g.us", &["a".to_string()], GroupAction::Demote)
            .await;
        let got = cache.get("g1@g.us").await.unwrap();
        assert!(!got.participants.iter().find(|p| p.id == "a").unwrap().is_admin);
    }

    #[tokio::test]
    async fn delta_for_unknown_group_is_ignored() {
        let cache = GroupCache::new();
        cache
            .apply_participants("never-seen@g.us", &["x".to_string()], GroupAction::Add)
            .await;
        assert!(cache.get("never-seen@g.us").await.is_none());
    }
}
