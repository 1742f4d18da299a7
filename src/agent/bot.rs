//! CloneBot - the engagement agent
//!
//! Wires the ledger, scorer, policy, follow gate, alert sink and schedule
//! together behind the `EventHandler` capability set.

use super::deferred::Deferrer;
use super::handler::EventHandler;
use super::reply::ReplyContext;
use crate::alert::AlertSink;
use crate::config::{normalize_handle, Config};
use crate::follow_gate::FollowGate;
use crate::interest::{classify, EngagementTier, KeywordSet};
use crate::ledger::PesterLedger;
use crate::model::{ModelLoader, TextModel};
use crate::policy::{Action, ContentKind, EngagementPolicy, RandomSource};
use crate::schedule::{
    alert_hook, posting_job, IntervalSpec, JobCallback, JobScheduler, ScheduleError,
    ScheduleHandle, ScheduleManager, TokioJobScheduler,
};
use crate::tokenizer::{Tokenizer, WordTokenizer};
use crate::transport::{DirectMessage, Post, ReplyTarget, Transport};
use anyhow::Context;
use async_trait::async_trait;
use futures_util::future::FutureExt;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tier passed for content kinds the policy does not score
const UNSCORED: EngagementTier = EngagementTier::NotInteresting;

/// Everything a deferred action needs, detached from the bot
#[derive(Clone)]
struct Executor {
    transport: Arc<dyn Transport>,
    model: Arc<dyn TextModel>,
    gate: Arc<FollowGate>,
    alerts: AlertSink,
}

impl Executor {
    async fn reply(&self, target: ReplyTarget, ctx: ReplyContext) {
        let response = match self.model.compose_response(&ctx.mentionless, ctx.limit).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Could not compose reply to @{}: {}", target.handle(), e);
                return;
            }
        };

        if let Err(e) = self.transport.reply(&target, &ctx.render(&response)).await {
            warn!("Reply to @{} failed: {}", target.handle(), e);
        }
    }

    /// Favorite `post`, or drop the relationship if its author fails the gate
    async fn favorite(&self, post: Post) {
        if self.gate.can_follow(&post.author).await {
            if let Err(e) = self.transport.favorite(&post).await {
                warn!("Favorite of {} failed: {}", post.id, e);
            }
            return;
        }

        info!("Unfollowing @{}", post.author);
        if let Err(e) = self.transport.unfollow(&post.author).await {
            warn!("Unfollow of @{} failed: {}", post.author, e);
        }
        self.alerts
            .notify(&format!(
                "Unfollowed @{} instead of favoriting post {}.",
                post.author, post.id
            ))
            .await;
    }

    async fn reshare(&self, post: Post) {
        if let Err(e) = self.transport.reshare(&post).await {
            warn!("Reshare of {} failed: {}", post.id, e);
        }
    }
}

pub struct CloneBot {
    config: Config,
    transport: Arc<dyn Transport>,
    tokenizer: Arc<dyn Tokenizer>,
    loader: Box<dyn ModelLoader>,
    model: OnceCell<Arc<dyn TextModel>>,
    keywords: OnceCell<KeywordSet>,
    ledger: Arc<PesterLedger>,
    policy: EngagementPolicy,
    rng: Arc<RandomSource>,
    gate: Arc<FollowGate>,
    alerts: AlertSink,
    schedule: ScheduleManager,
    deferrer: Deferrer,
    blacklist: RwLock<Vec<String>>,
}

impl CloneBot {
    /// Create a bot; the model is loaded later by `configure`
    pub fn new(config: Config, transport: Arc<dyn Transport>, loader: Box<dyn ModelLoader>) -> Self {
        let rng = Arc::new(RandomSource::from_seed(config.seed));
        let alerts = AlertSink::new(config.owner.clone(), transport.clone());
        let gate = Arc::new(FollowGate::new(
            config.follow_policy,
            config.owner.clone(),
            transport.clone(),
        ));
        let schedule = ScheduleManager::new(
            Arc::new(TokioJobScheduler::new()),
            alert_hook(alerts.clone()),
            alerts.clone(),
        );

        Self {
            tokenizer: Arc::new(WordTokenizer::new()),
            loader,
            model: OnceCell::new(),
            keywords: OnceCell::new(),
            ledger: Arc::new(PesterLedger::new()),
            policy: EngagementPolicy::new(config.odds),
            deferrer: Deferrer::new(config.delay, rng.clone()),
            blacklist: RwLock::new(config.blacklist.clone()),
            rng,
            gate,
            alerts,
            schedule,
            transport,
            config,
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Use a different job scheduler primitive
    pub fn with_scheduler(mut self, scheduler: Arc<dyn JobScheduler>) -> Self {
        self.schedule = ScheduleManager::new(
            scheduler,
            alert_hook(self.alerts.clone()),
            self.alerts.clone(),
        );
        self
    }

    /// Use a different random source for decisions and delays
    pub fn with_random(mut self, rng: Arc<RandomSource>) -> Self {
        self.deferrer = Deferrer::new(self.config.delay, rng.clone());
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &PesterLedger {
        &self.ledger
    }

    pub fn alerts(&self) -> &AlertSink {
        &self.alerts
    }

    pub fn deferrer(&self) -> &Deferrer {
        &self.deferrer
    }

    pub fn schedule(&self) -> &ScheduleManager {
        &self.schedule
    }

    pub fn model(&self) -> Option<&Arc<dyn TextModel>> {
        self.model.get()
    }

    /// Keyword views, computed once from the loaded model
    pub fn keywords(&self) -> Option<&KeywordSet> {
        let model = self.model.get()?;
        Some(self.keywords.get_or_init(|| KeywordSet::from_model(model.as_ref())))
    }

    pub fn blacklist(&self) -> Vec<String> {
        self.blacklist.read().clone()
    }

    pub fn is_blacklisted(&self, handle: &str) -> bool {
        self.blacklist
            .read()
            .iter()
            .any(|h| h.eq_ignore_ascii_case(handle))
    }

    /// Load the model once. A missing model is fatal.
    pub fn load_model(&self) -> anyhow::Result<Arc<dyn TextModel>> {
        if let Some(model) = self.model.get() {
            return Ok(model.clone());
        }

        info!("Loading model {}", self.loader.describe());
        let model = self
            .loader
            .load()
            .with_context(|| format!("loading model {}", self.loader.describe()))?;
        Ok(self.model.get_or_init(|| model).clone())
    }

    /// Post an unprompted statement every `interval`, replacing any
    /// previous schedule
    pub async fn set_schedule(&self, interval: &str) -> Result<ScheduleHandle, ScheduleError> {
        let interval = IntervalSpec::parse(interval)?;
        Ok(self.arm(interval).await)
    }

    async fn arm(&self, interval: IntervalSpec) -> ScheduleHandle {
        let job = match self.model.get() {
            Some(model) => posting_job(model.clone(), self.transport.clone()),
            None => missing_model_job(),
        };
        self.schedule.arm(interval, job).await
    }

    /// Block users; failures and successes are reported to the owner
    pub async fn block_users(&self, handles: &[String]) {
        if handles.is_empty() {
            return;
        }

        match self.transport.block(handles).await {
            Err(e) => self.alerts.notify(&format!("Error: {}", e)).await,
            Ok(()) => {
                self.blacklist
                    .write()
                    .extend(handles.iter().map(|h| normalize_handle(h)));
                self.alerts
                    .notify(&format!("Blocked user(s) {}.", handles.join(", ")))
                    .await;
            }
        }
    }

    /// Delete our own posts; failures and successes are reported to the owner
    pub async fn delete_posts(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }

        match self.transport.delete_posts(ids).await {
            Err(e) => self.alerts.notify(&format!("Error: {}", e)).await,
            Ok(()) => {
                self.alerts
                    .notify(&format!("Deleted post(s) {}.", ids.join(", ")))
                    .await
            }
        }
    }

    /// The bot's own most recent original post
    pub async fn last_post(&self) -> anyhow::Result<Option<Post>> {
        Ok(self
            .transport
            .fetch_recent_post(&self.config.username)
            .await?)
    }

    /// Events from ourselves or blacklisted users are dropped
    fn ignores(&self, handle: &str) -> bool {
        if handle.eq_ignore_ascii_case(&self.config.username) {
            return true;
        }
        if self.is_blacklisted(handle) {
            debug!("Ignoring blacklisted @{}", handle);
            return true;
        }
        false
    }

    fn executor(&self) -> Option<Executor> {
        let model = match self.model.get() {
            Some(model) => model.clone(),
            None => {
                warn!("Model not loaded; dropping event");
                return None;
            }
        };
        Some(Executor {
            transport: self.transport.clone(),
            model,
            gate: self.gate.clone(),
            alerts: self.alerts.clone(),
        })
    }

    fn decide(&self, kind: ContentKind, tier: EngagementTier, author: &str) -> Vec<Action> {
        self.policy
            .decide(kind, tier, author, &self.ledger, &self.rng)
    }

    /// Defer every action for a public post
    fn defer_post_actions(&self, exec: Executor, post: &Post, actions: Vec<Action>) {
        for action in actions {
            let exec = exec.clone();
            let post = post.clone();
            match action {
                Action::Favorite => {
                    self.deferrer.defer("favorite", async move { exec.favorite(post).await });
                }
                Action::Reshare => {
                    self.deferrer.defer("reshare", async move { exec.reshare(post).await });
                }
                Action::Reply { .. } => {
                    let ctx = ReplyContext::for_post(
                        &post,
                        &self.config.username,
                        exec.model.max_length(),
                    );
                    self.deferrer.defer("reply", async move {
                        exec.reply(ReplyTarget::from(&post), ctx).await
                    });
                }
            }
        }
    }
}

/// Posting job used when the schedule is armed before a model exists
fn missing_model_job() -> JobCallback {
    Arc::new(|| model_missing().boxed())
}

async fn model_missing() -> anyhow::Result<()> {
    anyhow::bail!("model not loaded")
}

#[async_trait]
impl EventHandler for CloneBot {
    async fn configure(&self) -> anyhow::Result<()> {
        self.load_model()?;
        if let Some(keywords) = self.keywords() {
            info!(
                "Keyword sets ready: {} broad, {} narrow",
                keywords.broad_len(),
                keywords.narrow_len()
            );
        }
        self.arm(self.config.frequency.clone()).await;
        Ok(())
    }

    async fn on_direct_message(&self, dm: &DirectMessage) {
        if self.ignores(&dm.sender) {
            return;
        }
        let Some(exec) = self.executor() else { return };

        let actions = self.decide(ContentKind::DirectMessage, UNSCORED, &dm.sender);
        for action in actions {
            if let Action::Reply { .. } = action {
                let exec = exec.clone();
                let target = ReplyTarget::from(dm);
                let ctx = ReplyContext::for_direct_message(dm, exec.model.max_length());
                self.deferrer
                    .defer("dm_reply", async move { exec.reply(target, ctx).await });
            }
        }
    }

    async fn on_mention(&self, post: &Post) {
        if self.ignores(&post.author) {
            return;
        }
        let Some(exec) = self.executor() else { return };

        let actions = self.decide(ContentKind::Mention, UNSCORED, &post.author);
        self.defer_post_actions(exec, post, actions);
    }

    async fn on_timeline_item(&self, post: &Post) {
        if post.is_reshare {
            debug!("Skipping reshare {} by @{}", post.id, post.author);
            return;
        }
        if self.ignores(&post.author) {
            return;
        }
        if !self.ledger.can_pester(&post.author) {
            debug!("No pesters left for @{}; skipping {}", post.author, post.id);
            return;
        }
        let Some(exec) = self.executor() else { return };
        let Some(keywords) = self.keywords() else { return };

        let tokens = self.tokenizer.tokenize(&post.text);
        let tier = classify(&tokens, keywords);
        let actions = self.decide(ContentKind::TimelineItem, tier, &post.author);
        self.defer_post_actions(exec, post, actions);
    }

    async fn on_follow_notification(&self, handle: &str) {
        if self.ignores(handle) {
            return;
        }

        if self.gate.can_follow(handle).await {
            if let Err(e) = self.transport.follow(handle).await {
                warn!("Follow of @{} failed: {}", handle, e);
            }
        } else {
            info!("Not following @{}", handle);
        }
    }
}
