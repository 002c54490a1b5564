pub mod analytics;
pub mod contests;
pub mod leaderboard;
pub mod profiles;
pub mod votes;

pub use self::contests::model::Contest;
pub use self::leaderboard::model::LeaderboardPage;
