//! Pure snapshot merge.
//!
//! Combines the three per-room source snapshots into the single list a
//! caller observes: deduplicated by message id, stably ordered by
//! timestamp, TEXT bodies decrypted.

use std::collections::HashMap;

use tracing::debug;

use confab_shared::cipher::ContentCipher;
use confab_shared::types::{Message, MessageType};

/// Merge the latest snapshot of each source into one feed emission.
///
/// Precedence for duplicate ids is first occurrence in
/// remote, realtime, local order, except that `status` takes the
/// furthest-advanced value seen anywhere, so a READ never regresses to
/// SENT just because a staler source repeats the message.
///
/// The sort is stable, so messages sharing a timestamp keep their
/// source order across emissions.
pub fn merge_snapshots(
    remote: &[Message],
    realtime: &[Message],
    local: &[Message],
    cipher: &ContentCipher,
) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::with_capacity(remote.len() + realtime.len() + local.len());
    let mut index: HashMap<_, usize> = HashMap::new();

    for message in remote.iter().chain(realtime).chain(local) {
        match index.get(&message.id) {
            Some(&at) => {
                let kept: &mut Message = &mut merged[at];
                if message.status.rank() > kept.status.rank() {
                    kept.status = message.status;
                }
            }
            None => {
                index.insert(message.id, merged.len());
                merged.push(message.clone());
            }
        }
    }

    merged.sort_by_key(|m| m.timestamp);

    for message in &mut merged {
        if message.kind == MessageType::Text {
            match cipher.decrypt(&message.content) {
                Ok(plaintext) => message.content = plaintext,
                Err(_) => {
                    // Legacy or already-plaintext body: show it as-is.
                    debug!(msg_id = %message.id, "content not decryptable, passing through");
                }
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, Utc};
    use confab_shared::types::{MessageStatus, RoomId};

    fn cipher() -> ContentCipher {
        ContentCipher::from_passphrase("merge tests")
    }

    fn encrypted(room: RoomId, body: &str, cipher: &ContentCipher) -> Message {
        let mut msg = Message::text(room, "u1", cipher.encrypt(body).unwrap());
        msg.timestamp = Utc::now();
        msg
    }

    #[test]
    fn test_deduplicates_by_id_across_sources() {
        let cipher = cipher();
        let room = RoomId::new();
        let msg = encrypted(room, "hello", &cipher);

        let merged = merge_snapshots(
            &[msg.clone()],
            &[msg.clone()],
            &[msg.clone()],
            &cipher,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content, "hello");
    }

    #[test]
    fn test_sorted_by_timestamp_regardless_of_source() {
        let cipher = cipher();
        let room = RoomId::new();
        let mut early = encrypted(room, "early", &cipher);
        let mut late = encrypted(room, "late", &cipher);
        early.timestamp = Utc::now() - Duration::minutes(5);
        late.timestamp = Utc::now();

        // Later message arrives from an earlier-precedence source.
        let merged = merge_snapshots(&[late], &[], &[early], &cipher);
        assert_eq!(merged[0].content, "early");
        assert_eq!(merged[1].content, "late");
    }

    #[test]
    fn test_status_never_regresses_across_duplicates() {
        let cipher = cipher();
        let room = RoomId::new();
        let msg = encrypted(room, "x", &cipher);

        let mut stale = msg.clone();
        stale.status = MessageStatus::Sent;
        let mut fresh = msg.clone();
        fresh.status = MessageStatus::Read;

        // Staler copy wins the first slot; the READ must still surface.
        let merged = merge_snapshots(&[stale], &[], &[fresh], &cipher);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].status, MessageStatus::Read);

        // And the other way around.
        let mut stale2 = msg.clone();
        stale2.status = MessageStatus::Sent;
        let mut fresh2 = msg;
        fresh2.status = MessageStatus::Read;
        let merged = merge_snapshots(&[fresh2], &[], &[stale2], &cipher);
        assert_eq!(merged[0].status, MessageStatus::Read);
    }

    #[test]
    fn test_undecryptable_text_passes_through_raw() {
        let cipher = cipher();
        let room = RoomId::new();
        let plain = Message::text(room, "u1", "never encrypted");

        let merged = merge_snapshots(&[plain], &[], &[], &cipher);
        assert_eq!(merged[0].content, "never encrypted");
    }

    #[test]
    fn test_attachments_are_not_run_through_the_cipher() {
        let cipher = cipher();
        let room = RoomId::new();
        let attachment = Message::attachment(
            room,
            "u1",
            MessageType::File,
            "https://blobs/abc",
            "report.pdf",
        );

        let merged = merge_snapshots(&[], &[attachment], &[], &cipher);
        assert_eq!(merged[0].content, "File: report.pdf");
    }

    #[test]
    fn test_equal_timestamps_keep_source_order() {
        let cipher = cipher();
        let room = RoomId::new();
        let ts = Utc::now();
        let mut a = encrypted(room, "a", &cipher);
        let mut b = encrypted(room, "b", &cipher);
        a.timestamp = ts;
        b.timestamp = ts;

        let merged = merge_snapshots(&[a], &[b], &[], &cipher);
        assert_eq!(merged[0].content, "a");
        assert_eq!(merged[1].content, "b");
    }
}
