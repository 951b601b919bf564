//! Feed aggregator scenarios

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use cinesync::feed::{FeedMode, FeedPage};
use cinesync::shared::content::{Movie, MovieId, RecommendationId};
use cinesync::shared::messaging::UserId;
use cinesync::shared::SyncError;

use crate::common::{date, recommendation, World};

fn ids(page: &FeedPage) -> Vec<i64> {
    page.entries.iter().map(|e| e.id().0).collect()
}

#[tokio::test]
async fn test_feed_of_user_following_nobody_is_empty() {
    let world = World::new();
    let page = assert_ok!(world.feed.get_feed(world.me, &CancellationToken::new()).await);
    assert!(page.is_empty());
    assert!(page.is_complete());
}

#[tokio::test]
async fn test_feed_orders_by_creation_date_descending() {
    let world = World::new();
    let author = world.followed_user("jo").await;
    world
        .content
        .add_recommendation(recommendation(1, author, date(2024, 1, 1)))
        .await;
    world
        .content
        .add_recommendation(recommendation(2, author, date(2024, 3, 1)))
        .await;
    world
        .content
        .add_recommendation(recommendation(3, author, date(2024, 2, 1)))
        .await;

    let page = assert_ok!(world.feed.get_feed(world.me, &CancellationToken::new()).await);
    let dates: Vec<_> = page.entries.iter().map(|e| e.created_at()).collect();
    pretty_assertions::assert_eq!(
        dates,
        vec![date(2024, 3, 1), date(2024, 2, 1), date(2024, 1, 1)]
    );
}

#[tokio::test]
async fn test_feed_interleaves_followed_authors() {
    let world = World::new();
    let b = world.followed_user("b").await;
    let c = world.followed_user("c").await;
    let (t1, t2, t3) = (date(2024, 5, 1), date(2024, 5, 2), date(2024, 5, 3));
    world.content.add_recommendation(recommendation(1, b, t1)).await;
    world.content.add_recommendation(recommendation(2, b, t3)).await;
    world.content.add_recommendation(recommendation(3, c, t2)).await;

    let page = assert_ok!(world.feed.get_feed(world.me, &CancellationToken::new()).await);
    pretty_assertions::assert_eq!(ids(&page), vec![2, 3, 1]);
}

#[tokio::test]
async fn test_follow_and_unfollow_change_the_feed() {
    let world = World::new();
    let author = UserId::new();
    world
        .content
        .add_recommendation(recommendation(9, author, date(2024, 6, 1)))
        .await;
    let cancel = CancellationToken::new();

    assert!(assert_ok!(world.feed.get_feed(world.me, &cancel).await).is_empty());

    assert_ok!(world.graph.follow(world.me, author).await);
    assert_eq!(ids(&assert_ok!(world.feed.get_feed(world.me, &cancel).await)), vec![9]);

    assert_ok!(world.graph.unfollow(world.me, author).await);
    assert!(assert_ok!(world.feed.get_feed(world.me, &cancel).await).is_empty());
}

#[tokio::test]
async fn test_author_without_recommendations_contributes_nothing() {
    let world = World::new();
    let quiet = world.followed_user("quiet").await;
    let loud = world.followed_user("loud").await;
    world
        .content
        .add_recommendation(recommendation(4, loud, date(2024, 1, 4)))
        .await;

    let page = assert_ok!(world.feed.get_feed(world.me, &CancellationToken::new()).await);
    assert_eq!(ids(&page), vec![4]);
    assert!(page.entries.iter().all(|e| e.author.id != quiet));
}

#[tokio::test]
async fn test_partial_failure_tolerated_unless_strict() {
    let world = World::new();
    let ok = world.followed_user("ok").await;
    let broken = world.followed_user("broken").await;
    world.content.add_recommendation(recommendation(1, ok, date(2024, 1, 1))).await;
    world.content.add_recommendation(recommendation(2, broken, date(2024, 1, 2))).await;
    world.content.fail_author(broken).await;
    let cancel = CancellationToken::new();

    let page = assert_ok!(
        world
            .feed
            .get_feed_with_mode(world.me, FeedMode::Lenient, &cancel)
            .await
    );
    assert_eq!(ids(&page), vec![1]);
    assert_eq!(page.failures.len(), 1);
    assert_eq!(page.failures[0].author, broken);

    assert_err!(
        world
            .feed
            .get_feed_with_mode(world.me, FeedMode::Strict, &cancel)
            .await,
        SyncError::PartialFetchFailure { .. }
    );
}

#[tokio::test]
async fn test_entries_carry_author_and_movie() {
    let world = World::new();
    let author = world.followed_user("kim").await;
    let mut movie = Movie::new(MovieId(2), "Paris, Texas");
    movie.poster = Some("posters/paris-texas.jpg".to_string());
    world.content.add_movie(movie).await;
    world
        .content
        .add_recommendation(recommendation(5, author, date(2024, 2, 2)))
        .await;

    let page = assert_ok!(world.feed.get_feed(world.me, &CancellationToken::new()).await);
    let entry = &page.entries[0];
    assert_eq!(entry.id(), RecommendationId(5));
    assert_eq!(entry.author.display_name.as_deref(), Some("kim"));
    let summary = entry.movie.as_ref().expect("movie summary");
    assert_eq!(summary.title, "Paris, Texas");
    assert_eq!(summary.poster.as_deref(), Some("posters/paris-texas.jpg"));
    assert_eq!(entry.comment_count(), Some(0));
}

#[tokio::test]
async fn test_movie_outage_does_not_fail_feed() {
    let world = World::new();
    let author = world.followed_user("lou").await;
    world
        .content
        .add_recommendation(recommendation(6, author, date(2024, 2, 3)))
        .await;
    world.content.set_fail_movies(true);

    let page = assert_ok!(world.feed.get_feed(world.me, &CancellationToken::new()).await);
    assert_eq!(ids(&page), vec![6]);
    assert!(page.entries[0].movie.is_none());
    assert!(page.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_closing_the_feed_cancels_fetches() {
    let world = World::new();
    let author = world.followed_user("max").await;
    world
        .content
        .add_recommendation(recommendation(7, author, date(2024, 2, 4)))
        .await;
    world
        .content
        .set_read_delay(Some(Duration::from_secs(20)))
        .await;

    let cancel = CancellationToken::new();
    let closer = cancel.clone();
    let (result, _) = tokio::join!(world.feed.get_feed(world.me, &cancel), async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        closer.cancel();
    });
    assert_eq!(result, Err(SyncError::Cancelled));
}
