//! Property-based tests for feed aggregation

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use cinesync::feed::FeedAggregator;
use cinesync::graph::FollowGraph;
use cinesync::shared::content::{MovieId, Recommendation, RecommendationId};
use cinesync::shared::messaging::UserId;
use cinesync::shared::SyncConfig;
use cinesync::stores::memory::{
    InMemoryContentStore, InMemoryFollowGraphStore, InMemoryUserDirectory,
};

proptest! {
    #[test]
    fn test_feed_is_sorted_filtered_and_deduplicated(
        recs in prop::collection::vec((1i64..30, 0usize..4, 0i64..50), 0..40),
        followed in prop::collection::btree_set(0usize..4, 0..4),
        concurrency in 1usize..4,
    ) {
        let me = UserId::new();
        let authors: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
        let graph = Arc::new(FollowGraph::new(Arc::new(InMemoryFollowGraphStore::new())));
        let content = Arc::new(InMemoryContentStore::new());
        let config = SyncConfig::builder().feed_fetch_concurrency(concurrency).build().unwrap();
        let feed = FeedAggregator::new(
            graph.clone(),
            content.clone(),
            Arc::new(InMemoryUserDirectory::new()),
            config,
        )
        .unwrap();

        // A recommendation id belongs to its first author
        let mut canonical: BTreeMap<i64, Recommendation> = BTreeMap::new();
        for (id, author, secs) in &recs {
            canonical.entry(*id).or_insert_with(|| Recommendation {
                id: RecommendationId(*id),
                author_id: authors[*author],
                movie_id: MovieId(1),
                content: String::new(),
                created_at: Utc.timestamp_opt(*secs, 0).unwrap(),
                comment_count: None,
            });
        }

        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let page = rt.block_on(async {
            for index in &followed {
                graph.follow(me, authors[*index]).await.unwrap();
            }
            for (id, _, _) in &recs {
                content.add_recommendation(canonical[id].clone()).await;
            }
            feed.get_feed(me, &CancellationToken::new()).await.unwrap()
        });

        let followed_ids: BTreeSet<UserId> = followed.iter().map(|i| authors[*i]).collect();
        let expected: BTreeSet<i64> = canonical
            .values()
            .filter(|r| followed_ids.contains(&r.author_id))
            .map(|r| r.id.0)
            .collect();
        let got: Vec<i64> = page.entries.iter().map(|e| e.id().0).collect();
        let got_set: BTreeSet<i64> = got.iter().copied().collect();

        prop_assert_eq!(got.len(), got_set.len());
        prop_assert_eq!(got_set, expected);
        prop_assert!(page.entries.windows(2).all(|w|
            (w[0].created_at(), w[0].id()) > (w[1].created_at(), w[1].id())
        ));
    }
}
