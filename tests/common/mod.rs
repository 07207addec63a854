pub mod fake_feed;
