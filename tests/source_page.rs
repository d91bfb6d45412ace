// tests/source_page.rs
use mixsite_agent::source::page::ProfilePageSource;
use mixsite_agent::source::MixSource;

const PAGE_HTML: &str = include_str!("fixtures/profile_page.html");

#[tokio::test]
async fn fixture_page_yields_cards_with_title_and_link_only() {
    let source = ProfilePageSource::from_fixture_str(PAGE_HTML);
    let mixes = source.fetch_latest(20).await.expect("page parse ok");

    // The third card has no title element and is skipped.
    assert_eq!(mixes.len(), 2);

    assert_eq!(mixes[0].title, "Friday Night Live Vol. 12");
    assert_eq!(
        mixes[0].url,
        "https://www.mixcloud.com/djjackspace/friday-night-live-vol-12/"
    );
    assert_eq!(mixes[0].id, "friday-night-live-vol-12");

    // Fallback scrape carries no metadata.
    assert!(mixes[0].description.is_empty());
    assert!(mixes[0].published.is_empty());
    assert!(mixes[0].tags.is_empty());
}

#[tokio::test]
async fn page_and_feed_agree_on_ids_for_the_same_mix() {
    use mixsite_agent::source::feed::FeedSource;

    let feed = FeedSource::from_fixture_str(include_str!("fixtures/mixcloud_feed.xml"));
    let page = ProfilePageSource::from_fixture_str(PAGE_HTML);

    let from_feed = feed.fetch_latest(20).await.unwrap();
    let from_page = page.fetch_latest(20).await.unwrap();

    assert_eq!(from_feed[0].id, from_page[0].id);
    assert_eq!(from_feed[1].id, from_page[1].id);
}
