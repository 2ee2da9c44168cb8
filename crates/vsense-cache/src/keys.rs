//! Cache key builders for the read-views.
//!
//! Every cached view of a video's state is addressed through one of
//! these builders so invalidation and population cannot drift apart.

/// Key for the full-record view of a single video.
pub fn video_key(video_id: &str) -> String {
    format!("video:{}:full", video_id)
}

/// Key for the stream-metadata view of a single video.
pub fn video_stream_key(video_id: &str) -> String {
    format!("video:{}:stream", video_id)
}

/// Glob matching every cached list view owned by a user.
pub fn video_list_pattern(user_id: &str) -> String {
    format!("videos:list:{}:*", user_id)
}

/// Key for a user's aggregate video stats.
pub fn video_stats_key(user_id: &str) -> String {
    format!("videos:stats:{}", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        assert_eq!(video_key("abc"), "video:abc:full");
        assert_eq!(video_stream_key("abc"), "video:abc:stream");
        assert_eq!(video_list_pattern("u1"), "videos:list:u1:*");
        assert_eq!(video_stats_key("u1"), "videos:stats:u1");
    }
}
