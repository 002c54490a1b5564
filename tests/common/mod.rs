use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;
use voteboard::AppState;
use voteboard::modules::analytics::{AnalyticsRollup, Period};
use voteboard::modules::contests::{
    Contest, ContestFilterParams, ContestStatus, PaginatedContestsResponse,
    PaginatedParticipantsResponse, Participant, UpdateContestDto,
};
use voteboard::modules::leaderboard::{LeaderboardEntry, LeaderboardPage};
use voteboard::modules::profiles::{Profile, ProfileRank, ProfileStats, UpdateProfileDto};
use voteboard::modules::votes::{CastVoteDto, Vote, VoteTally};
use voteboard::repository::VotingRepository;
use voteboard::utils::pagination::PaginationMeta;
use voteboard_cache::CacheService;
use voteboard_cache::keys::ParticipantQuery;
use voteboard_config::TtlConfig;

#[derive(Default)]
struct Data {
    contests: HashMap<String, Contest>,
    profiles: HashMap<String, Profile>,
    participants: Vec<Participant>,
    votes: Vec<Vote>,
}

/// In-memory repository that counts how often each method runs.
#[derive(Default)]
pub struct CountingRepository {
    data: Mutex<Data>,
    calls: Mutex<HashMap<&'static str, u32>>,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl CountingRepository {
    /// Contests `c1`, `c2` and profiles `p1`..`p3`, all entered in `c1`.
    pub fn seeded() -> Self {
        let repo = Self::default();
        {
            let mut data = repo.data.lock();
            for (id, title) in [("c1", "Spring Photo"), ("c2", "Summer Poem")] {
                data.contests.insert(
                    id.to_string(),
                    Contest {
                        id: id.to_string(),
                        title: title.to_string(),
                        description: None,
                        status: ContestStatus::Open,
                        participant_count: 0,
                        vote_count: 0,
                        updated_at: Utc::now(),
                    },
                );
            }
            for (id, name) in [("p1", "Ada"), ("p2", "Grace"), ("p3", "Linus")] {
                data.profiles.insert(
                    id.to_string(),
                    Profile {
                        id: id.to_string(),
                        display_name: name.to_string(),
                        bio: None,
                        updated_at: Utc::now(),
                    },
                );
                data.participants.push(Participant {
                    profile_id: id.to_string(),
                    contest_id: "c1".to_string(),
                    display_name: name.to_string(),
                    votes: 0,
                    joined_at: Utc::now(),
                });
            }
            if let Some(contest) = data.contests.get_mut("c1") {
                contest.participant_count = 3;
            }
        }
        repo
    }

    pub fn calls(&self, method: &str) -> u32 {
        self.calls.lock().get(method).copied().unwrap_or(0)
    }

    /// Make every read fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, method: &'static str) -> anyhow::Result<()> {
        *self.calls.lock().entry(method).or_default() += 1;
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("database unavailable");
        }
        Ok(())
    }

    fn ranking(data: &Data, contest_id: Option<&str>) -> Vec<LeaderboardEntry> {
        let mut votes: HashMap<&str, u64> =
            data.profiles.keys().map(|id| (id.as_str(), 0)).collect();
        for vote in &data.votes {
            if contest_id.is_none_or(|id| id == vote.contest_id) {
                *votes.entry(vote.profile_id.as_str()).or_default() += 1;
            }
        }

        let mut rows: Vec<(&str, u64)> = votes.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        rows.into_iter()
            .enumerate()
            .map(|(i, (id, votes))| LeaderboardEntry {
                rank: i as u32 + 1,
                profile_id: id.to_string(),
                display_name: data.profiles[id].display_name.clone(),
                votes,
            })
            .collect()
    }

    fn page(
        rows: Vec<LeaderboardEntry>,
        contest_id: Option<&str>,
        page: u32,
        limit: u32,
    ) -> LeaderboardPage {
        let total = rows.len() as u64;
        let skip = ((page.max(1) - 1) * limit) as usize;
        LeaderboardPage {
            contest_id: contest_id.map(str::to_string),
            data: rows.into_iter().skip(skip).take(limit as usize).collect(),
            meta: PaginationMeta::new(total, page, limit),
        }
    }
}

#[async_trait]
impl VotingRepository for CountingRepository {
    async fn leaderboard(&self, page: u32, limit: u32) -> anyhow::Result<LeaderboardPage> {
        self.record("leaderboard")?;
        let data = self.data.lock();
        Ok(Self::page(Self::ranking(&data, None), None, page, limit))
    }

    async fn contest_leaderboard(
        &self,
        contest_id: &str,
        page: u32,
        limit: u32,
    ) -> anyhow::Result<LeaderboardPage> {
        self.record("contest_leaderboard")?;
        let data = self.data.lock();
        let rows = Self::ranking(&data, Some(contest_id));
        Ok(Self::page(rows, Some(contest_id), page, limit))
    }

    async fn contest(&self, contest_id: &str) -> anyhow::Result<Option<Contest>> {
        self.record("contest")?;
        Ok(self.data.lock().contests.get(contest_id).cloned())
    }

    async fn contests(
        &self,
        filters: &ContestFilterParams,
    ) -> anyhow::Result<PaginatedContestsResponse> {
        self.record("contests")?;
        let data = self.data.lock();
        let mut contests: Vec<Contest> = data
            .contests
            .values()
            .filter(|c| filters.status.is_none_or(|status| c.status == status))
            .filter(|c| {
                filters
                    .search
                    .as_deref()
                    .is_none_or(|search| c.title.to_lowercase().contains(&search.to_lowercase()))
            })
            .cloned()
            .collect();
        contests.sort_by(|a, b| a.id.cmp(&b.id));

        let total = contests.len() as u64;
        Ok(PaginatedContestsResponse {
            data: contests,
            meta: PaginationMeta::new(total, filters.pagination.page(), filters.pagination.limit()),
        })
    }

    async fn participants(
        &self,
        contest_id: &str,
        query: &ParticipantQuery,
    ) -> anyhow::Result<PaginatedParticipantsResponse> {
        self.record("participants")?;
        let data = self.data.lock();
        let rows: Vec<Participant> = data
            .participants
            .iter()
            .filter(|p| p.contest_id == contest_id)
            .filter(|p| {
                query.search.as_deref().is_none_or(|search| {
                    p.display_name
                        .to_lowercase()
                        .contains(&search.to_lowercase())
                })
            })
            .cloned()
            .collect();

        let total = rows.len() as u64;
        Ok(PaginatedParticipantsResponse {
            data: rows,
            meta: PaginationMeta::new(total, query.page.unwrap_or(1), query.limit.unwrap_or(10)),
        })
    }

    async fn add_participant(
        &self,
        contest_id: &str,
        profile_id: &str,
    ) -> anyhow::Result<Option<Participant>> {
        self.record("add_participant")?;
        let mut data = self.data.lock();
        let Some(profile) = data.profiles.get(profile_id).cloned() else {
            anyhow::bail!("unknown profile {profile_id}");
        };
        let Some(contest) = data.contests.get_mut(contest_id) else {
            return Ok(None);
        };
        contest.participant_count += 1;

        let participant = Participant {
            profile_id: profile.id,
            contest_id: contest_id.to_string(),
            display_name: profile.display_name,
            votes: 0,
            joined_at: Utc::now(),
        };
        data.participants.push(participant.clone());
        Ok(Some(participant))
    }

    async fn update_contest(
        &self,
        contest_id: &str,
        dto: &UpdateContestDto,
    ) -> anyhow::Result<Option<Contest>> {
        self.record("update_contest")?;
        let mut data = self.data.lock();
        let Some(contest) = data.contests.get_mut(contest_id) else {
            return Ok(None);
        };
        if let Some(title) = &dto.title {
            contest.title = title.clone();
        }
        if let Some(description) = &dto.description {
            contest.description = Some(description.clone());
        }
        if let Some(status) = dto.status {
            contest.status = status;
        }
        contest.updated_at = Utc::now();
        Ok(Some(contest.clone()))
    }

    async fn profile(&self, profile_id: &str) -> anyhow::Result<Option<Profile>> {
        self.record("profile")?;
        Ok(self.data.lock().profiles.get(profile_id).cloned())
    }

    async fn profile_rank(&self, profile_id: &str) -> anyhow::Result<Option<ProfileRank>> {
        self.record("profile_rank")?;
        let data = self.data.lock();
        Ok(Self::ranking(&data, None)
            .into_iter()
            .find(|row| row.profile_id == profile_id)
            .map(|row| ProfileRank {
                profile_id: row.profile_id,
                rank: row.rank,
                votes: row.votes,
            }))
    }

    async fn profile_stats(&self, profile_id: &str) -> anyhow::Result<Option<ProfileStats>> {
        self.record("profile_stats")?;
        let data = self.data.lock();
        if !data.profiles.contains_key(profile_id) {
            return Ok(None);
        }
        Ok(Some(ProfileStats {
            profile_id: profile_id.to_string(),
            contests_entered: data
                .participants
                .iter()
                .filter(|p| p.profile_id == profile_id)
                .count() as u64,
            votes_received: data.votes.iter().filter(|v| v.profile_id == profile_id).count() as u64,
            votes_cast: data.votes.iter().filter(|v| v.voter_id == profile_id).count() as u64,
        }))
    }

    async fn update_profile(
        &self,
        profile_id: &str,
        dto: &UpdateProfileDto,
    ) -> anyhow::Result<Option<Profile>> {
        self.record("update_profile")?;
        let mut data = self.data.lock();
        let Some(profile) = data.profiles.get_mut(profile_id) else {
            return Ok(None);
        };
        if let Some(name) = &dto.display_name {
            profile.display_name = name.clone();
        }
        if let Some(bio) = &dto.bio {
            profile.bio = Some(bio.clone());
        }
        profile.updated_at = Utc::now();
        Ok(Some(profile.clone()))
    }

    async fn analytics(&self, scope: &str, period: Period) -> anyhow::Result<AnalyticsRollup> {
        self.record("analytics")?;
        let data = self.data.lock();
        let mut voters: Vec<&str> = data.votes.iter().map(|v| v.voter_id.as_str()).collect();
        voters.sort_unstable();
        voters.dedup();

        Ok(AnalyticsRollup {
            scope: scope.to_string(),
            period,
            total_votes: data.votes.len() as u64,
            unique_voters: voters.len() as u64,
            active_contests: data
                .contests
                .values()
                .filter(|c| c.status == ContestStatus::Open)
                .count() as u64,
            generated_at: Utc::now(),
        })
    }

    async fn record_vote(&self, vote: &CastVoteDto) -> anyhow::Result<Vote> {
        self.record("record_vote")?;
        let mut data = self.data.lock();
        if !data.contests.contains_key(&vote.contest_id) {
            anyhow::bail!("unknown contest {}", vote.contest_id);
        }

        let vote = Vote {
            id: Uuid::new_v4(),
            contest_id: vote.contest_id.clone(),
            profile_id: vote.profile_id.clone(),
            voter_id: vote.voter_id.clone(),
            cast_at: Utc::now(),
        };
        data.votes.push(vote.clone());
        if let Some(contest) = data.contests.get_mut(&vote.contest_id) {
            contest.vote_count += 1;
        }
        Ok(vote)
    }

    async fn vote_tally(&self, contest_id: &str) -> anyhow::Result<VoteTally> {
        self.record("vote_tally")?;
        let data = self.data.lock();
        let votes: Vec<&Vote> = data.votes.iter().filter(|v| v.contest_id == contest_id).collect();
        let mut voters: Vec<&str> = votes.iter().map(|v| v.voter_id.as_str()).collect();
        voters.sort_unstable();
        voters.dedup();

        Ok(VoteTally {
            contest_id: contest_id.to_string(),
            total_votes: votes.len() as u64,
            unique_voters: voters.len() as u64,
        })
    }
}

/// State over a seeded repository and a fresh in-memory cache.
#[allow(dead_code)]
pub fn test_state() -> (AppState, Arc<CountingRepository>) {
    test_state_with(CacheService::in_memory())
}

#[allow(dead_code)]
pub fn test_state_with(cache: CacheService) -> (AppState, Arc<CountingRepository>) {
    let repo = Arc::new(CountingRepository::seeded());
    let state = AppState::new(repo.clone(), cache, TtlConfig::default());
    (state, repo)
}

#[allow(dead_code)]
pub fn vote(contest_id: &str, profile_id: &str, voter_id: &str) -> CastVoteDto {
    CastVoteDto {
        contest_id: contest_id.to_string(),
        profile_id: profile_id.to_string(),
        voter_id: voter_id.to_string(),
    }
}
