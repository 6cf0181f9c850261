//! The per-event dispatch pipeline.
//!
//! Every inbound event runs the same strict gauntlet, short-circuiting at
//! the first gate that says stop:
//!
//! 1. guild gate — channel-space events dropped when administratively off
//! 2. rate-limit gate — mutes, cooldowns, duplicate-message throttle
//! 3. normalization into a [`Context`]
//! 4. allow/deny lists
//! 5. reply binding
//! 6. candidate materialization (one fresh plugin instance per descriptor,
//!    ascending priority, filtered by group enable/disable and event scope)
//! 7. context-hook phase — a plugin holding conversational state may claim
//!    the event before any rule runs
//! 8. attention gate — per-group "only react when addressed" modes
//! 9. dialect normalization — alternate command prefixes canonicalized and
//!    tagged
//! 10. accept phase — at most one plugin's accept takes effect
//! 11. rule matching — first rule whose handler doesn't pass wins; a
//!     permission failure or handler error stops everything (fail-stop,
//!     not fail-over)
//!
//! Many events may be in flight at once; the pipeline holds no lock while
//! running plugin code. The only shared state it touches is the registry
//! snapshot and the cooldown store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, error, info, warn};

use ingot_core::{
    AccessSettings, AttentionMode, ConfigProvider, Context, CooldownStore, CounterStore,
    GroupSettings, MemberRole, RawEvent, Transport,
};

use crate::plugin::{AcceptOutcome, ContextOutcome, Permission, Plugin, Rule, RuleOutcome};
use crate::registry::PluginRegistry;
use crate::reply::ReplyAgent;

struct CompiledDialect {
    name: String,
    trigger: Regex,
    canonical: String,
}

struct Candidate {
    name: String,
    plugin: Box<dyn Plugin>,
}

/// The event dispatch pipeline.
pub struct DispatchPipeline {
    registry: Arc<PluginRegistry>,
    cooldowns: CooldownStore,
    transport: Arc<dyn Transport>,
    config: Arc<dyn ConfigProvider>,
    counters: Arc<dyn CounterStore>,
    dialects: Vec<CompiledDialect>,
}

impl DispatchPipeline {
    /// Builds a pipeline over the given collaborators.
    ///
    /// Dialect triggers are compiled once here; one with an invalid pattern
    /// is dropped with a warning.
    pub fn new(
        registry: Arc<PluginRegistry>,
        cooldowns: CooldownStore,
        transport: Arc<dyn Transport>,
        config: Arc<dyn ConfigProvider>,
        counters: Arc<dyn CounterStore>,
    ) -> Self {
        let dialects = config
            .dialects()
            .into_iter()
            .filter_map(|d| match Regex::new(&d.trigger) {
                Ok(trigger) => Some(CompiledDialect {
                    name: d.name,
                    trigger,
                    canonical: d.canonical,
                }),
                Err(err) => {
                    warn!(dialect = %d.name, error = %err, "invalid dialect trigger, dropped");
                    None
                }
            })
            .collect();

        Self {
            registry,
            cooldowns,
            transport,
            config,
            counters,
            dialects,
        }
    }

    /// Runs one event through the pipeline.
    pub async fn dispatch(&self, event: RawEvent) {
        let access = self.config.access();

        if access.disable_guild_msg && event.is_guild() {
            return;
        }

        if !self.check_limit(&event) {
            return;
        }

        let event = Arc::new(event);
        let group_cfg = self.config.group(event.group_id);
        let identity = self.transport.identity();
        let mut ctx = Context::from_event(
            Arc::clone(&event),
            &identity,
            &access.masters,
            &group_cfg.bot_alias,
        );

        if !check_access(&ctx, &access) {
            debug!(user = ?event.user_id, group = ?event.group_id, "event denied by access lists");
            return;
        }

        let reply = ReplyAgent::new(
            &ctx,
            Arc::clone(&self.transport),
            Arc::clone(&self.counters),
            &self.config.bot(),
            &access,
        );

        let mut candidates = self.materialize(&ctx, &group_cfg);

        // Context-hook phase: a plugin mid-conversation gets first refusal.
        for candidate in &mut candidates {
            match candidate.plugin.poll_context(&mut ctx, &reply).await {
                ContextOutcome::Idle | ContextOutcome::Continue => {}
                ContextOutcome::Claimed => {
                    debug!(plugin = %candidate.name, "event claimed by conversational context");
                    return;
                }
            }
        }

        if !attention_ok(&ctx, &group_cfg) {
            return;
        }

        self.normalize_dialect(&mut ctx);

        // Accept phase: at most one accept takes effect per event.
        for candidate in &mut candidates {
            match candidate.plugin.accept(&mut ctx, &reply).await {
                AcceptOutcome::Pass => {}
                AcceptOutcome::Take => break,
                AcceptOutcome::Halt => {
                    debug!(plugin = %candidate.name, "event halted by accept hook");
                    return;
                }
            }
        }

        self.run_rules(&mut candidates, &mut ctx, &reply, &group_cfg)
            .await;
    }

    /// Instantiates one plugin per registered descriptor, keeping those
    /// that pass the per-group name filter and the declared event scope.
    fn materialize(&self, ctx: &Context, group_cfg: &GroupSettings) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for descriptor in self.registry.snapshot() {
            let plugin = (descriptor.factory)();
            if !plugin_enabled(plugin.name(), group_cfg) {
                continue;
            }
            if !plugin.event_scope().matches(&ctx.event) {
                continue;
            }
            candidates.push(Candidate {
                name: descriptor.name,
                plugin,
            });
        }
        candidates
    }

    async fn run_rules(
        &self,
        candidates: &mut [Candidate],
        ctx: &mut Context,
        reply: &ReplyAgent,
        group_cfg: &GroupSettings,
    ) {
        'rules: for candidate in candidates.iter_mut() {
            let rules = candidate.plugin.rules();
            for rule in rules {
                if let Some(filter) = &rule.event {
                    if !filter.matches(&ctx.event) {
                        continue;
                    }
                }
                if !rule.pattern.is_match(&ctx.msg) {
                    continue;
                }

                if rule.log {
                    info!(
                        plugin = %candidate.name,
                        handler = %rule.handler,
                        from = %ctx.log_text,
                        msg = %ctx.msg_preview(),
                        "rule matched"
                    );
                }

                if !check_permission(ctx, &rule, reply).await {
                    // The user was already notified; rule evaluation ends
                    // for the whole event, not just this plugin.
                    break 'rules;
                }

                let started = Instant::now();
                match candidate
                    .plugin
                    .handle(&rule.handler, ctx, reply)
                    .await
                {
                    Ok(RuleOutcome::Pass) => continue,
                    Ok(RuleOutcome::Handled) => {
                        self.set_limit(ctx, group_cfg);
                        if rule.log {
                            info!(
                                plugin = %candidate.name,
                                handler = %rule.handler,
                                msg = %ctx.msg_preview(),
                                elapsed_ms = started.elapsed().as_millis() as u64,
                                "rule handled"
                            );
                        }
                        break 'rules;
                    }
                    Err(err) => {
                        error!(
                            plugin = %candidate.name,
                            handler = %rule.handler,
                            error = %err,
                            "rule handler failed"
                        );
                        break 'rules;
                    }
                }
            }
        }
    }

    /// Gate 2: mutes, cooldowns, and the duplicate-message throttle.
    ///
    /// The throttle entry is recorded here at the gate — two identical
    /// events 150 ms apart dedupe even if the first is still mid-pipeline.
    fn check_limit(&self, event: &RawEvent) -> bool {
        if event.is_group() && event.group_mute_left > 0 {
            return false;
        }
        if !event.has_message() || event.is_private() {
            return true;
        }

        let group_cfg = self.config.group(event.group_id);
        if let Some(group_id) = event.group_id {
            if group_cfg.group_global_cd_ms > 0 && self.cooldowns.group_active(group_id) {
                return false;
            }
            if group_cfg.single_cd_ms > 0
                && let Some(user_id) = event.user_id
                && self.cooldowns.member_active(group_id, user_id)
            {
                return false;
            }
        }

        if let Some(user_id) = event.user_id
            && self.cooldowns.throttle(user_id, &event.raw_message)
        {
            return false;
        }

        true
    }

    /// Commits cooldowns after a rule handler wins.
    fn set_limit(&self, ctx: &Context, group_cfg: &GroupSettings) {
        if !ctx.event.has_message() || ctx.is_private {
            return;
        }
        let Some(group_id) = ctx.event.group_id else {
            return;
        };
        if group_cfg.group_global_cd_ms > 0 {
            self.cooldowns
                .set_group(group_id, Duration::from_millis(group_cfg.group_global_cd_ms));
        }
        if group_cfg.single_cd_ms > 0
            && let Some(user_id) = ctx.event.user_id
        {
            self.cooldowns
                .set_member(group_id, user_id, Duration::from_millis(group_cfg.single_cd_ms));
        }
    }

    /// Gate 9: canonicalizes the first matching dialect prefix and tags the
    /// context with where it came from.
    fn normalize_dialect(&self, ctx: &mut Context) {
        for dialect in &self.dialects {
            if dialect.trigger.is_match(&ctx.msg) {
                ctx.msg = dialect
                    .trigger
                    .replace(&ctx.msg, dialect.canonical.as_str())
                    .into_owned();
                ctx.dialect = Some(dialect.name.clone());
                break;
            }
        }
    }
}

/// Gate 4: black/white list checks on user, at-target, then group.
fn check_access(ctx: &Context, access: &AccessSettings) -> bool {
    if let Some(user_id) = ctx.event.user_id {
        if !access.black_users.is_empty() {
            if access.black_users.contains(&user_id) {
                return false;
            }
            if let Some(at) = &ctx.at
                && let Ok(at_id) = at.parse::<i64>()
                && access.black_users.contains(&at_id)
            {
                return false;
            }
        }
        if !access.white_users.is_empty() && !access.white_users.contains(&user_id) {
            return false;
        }
    }

    if let Some(group_id) = ctx.event.group_id {
        if !access.black_groups.is_empty() && access.black_groups.contains(&group_id) {
            return false;
        }
        if !access.white_groups.is_empty() && !access.white_groups.contains(&group_id) {
            return false;
        }
    }

    true
}

/// Gate 8: per-group "only react when addressed" modes.
fn attention_ok(ctx: &Context, group_cfg: &GroupSettings) -> bool {
    if !ctx.event.has_message() || ctx.is_private {
        return true;
    }
    if group_cfg.only_reply_at == AttentionMode::Off || group_cfg.bot_alias.is_empty() {
        return true;
    }
    if group_cfg.only_reply_at == AttentionMode::MastersExempt && ctx.is_master {
        return true;
    }
    ctx.at_bot || ctx.has_alias
}

/// Per-group plugin name filter.
fn plugin_enabled(name: &str, group_cfg: &GroupSettings) -> bool {
    if !group_cfg.disable.is_empty() && group_cfg.disable.iter().any(|n| n == name) {
        return false;
    }
    if !group_cfg.enable.is_empty() && !group_cfg.enable.iter().any(|n| n == name) {
        return false;
    }
    true
}

/// Checks a rule's required role, notifying the user on failure.
///
/// Returns `false` on denial — the caller aborts rule evaluation for the
/// whole event.
async fn check_permission(ctx: &Context, rule: &Rule, reply: &ReplyAgent) -> bool {
    match rule.permission {
        Permission::All => true,
        Permission::Master => {
            if ctx.is_master {
                true
            } else {
                reply
                    .send("no permission: only the bot master can do that")
                    .await;
                false
            }
        }
        Permission::Owner | Permission::Admin => {
            if !ctx.is_group {
                return true;
            }
            let role = ctx.event.sender.as_ref().and_then(|s| s.role);
            let Some(role) = role else {
                reply
                    .send("member data is still loading, try again shortly")
                    .await;
                return false;
            };
            match rule.permission {
                Permission::Owner => {
                    if role == MemberRole::Owner {
                        true
                    } else {
                        reply
                            .send("no permission: only the group owner can do that")
                            .await;
                        false
                    }
                }
                _ => {
                    if matches!(
                        role,
                        MemberRole::Owner | MemberRole::Admin
                    ) {
                        true
                    } else {
                        reply
                            .send("no permission: only group admins can do that")
                            .await;
                        false
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::loader::{ModuleLoader, PluginSource};
    use crate::plugin::{Plugin, PluginFactory, factory};
    use crate::scheduler::TaskScheduler;
    use async_trait::async_trait;
    use ingot_core::{
        BotIdentity, BotSettings, DialectSettings, EventKind, HookRegistry, MessageReceipt,
        OutboundMessage, Segment, SendResult, Sender,
    };
    use parking_lot::Mutex;
    use std::collections::HashMap;

    // ─── Probe plugin ────────────────────────────────────────────────────────

    #[derive(Clone, Copy, PartialEq)]
    enum HandleBehavior {
        Handled,
        Pass,
        Fail,
    }

    #[derive(Clone)]
    struct ProbeSpec {
        name: &'static str,
        priority: i32,
        scope: &'static str,
        rules: Vec<Rule>,
        accept: Option<AcceptOutcome>,
        context: Option<ContextOutcome>,
        handlers: HashMap<&'static str, HandleBehavior>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ProbeSpec {
        fn new(name: &'static str, priority: i32, calls: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                priority,
                scope: "message",
                rules: Vec::new(),
                accept: None,
                context: None,
                handlers: HashMap::new(),
                calls,
            }
        }

        fn rule(mut self, rule: Rule, behavior: HandleBehavior) -> Self {
            let handler: &'static str = Box::leak(rule.handler.clone().into_boxed_str());
            self.handlers.insert(handler, behavior);
            self.rules.push(rule);
            self
        }

        fn accepting(mut self, outcome: AcceptOutcome) -> Self {
            self.accept = Some(outcome);
            self
        }

        fn with_context(mut self, outcome: ContextOutcome) -> Self {
            self.context = Some(outcome);
            self
        }

        fn scoped(mut self, scope: &'static str) -> Self {
            self.scope = scope;
            self
        }
    }

    struct ProbePlugin {
        spec: ProbeSpec,
    }

    #[async_trait]
    impl Plugin for ProbePlugin {
        fn name(&self) -> &str {
            self.spec.name
        }

        fn priority(&self) -> i32 {
            self.spec.priority
        }

        fn event_scope(&self) -> ingot_core::EventFilter {
            ingot_core::EventFilter::new(self.spec.scope)
        }

        fn rules(&self) -> Vec<Rule> {
            self.spec.rules.clone()
        }

        async fn poll_context(&mut self, _ctx: &mut Context, _reply: &ReplyAgent) -> ContextOutcome {
            match self.spec.context {
                Some(outcome) => {
                    self.spec.calls.lock().push(format!("{}:context", self.spec.name));
                    outcome
                }
                None => ContextOutcome::Idle,
            }
        }

        async fn accept(&mut self, _ctx: &mut Context, _reply: &ReplyAgent) -> AcceptOutcome {
            match self.spec.accept {
                Some(outcome) => {
                    self.spec.calls.lock().push(format!("{}:accept", self.spec.name));
                    outcome
                }
                None => AcceptOutcome::Pass,
            }
        }

        async fn handle(
            &mut self,
            handler: &str,
            ctx: &mut Context,
            _reply: &ReplyAgent,
        ) -> crate::error::PluginResult<RuleOutcome> {
            self.spec.calls.lock().push(format!(
                "{}:{}:{}",
                self.spec.name,
                handler,
                ctx.dialect.as_deref().unwrap_or("-")
            ));
            match self.spec.handlers.get(handler).copied() {
                Some(HandleBehavior::Handled) => Ok(RuleOutcome::Handled),
                Some(HandleBehavior::Pass) => Ok(RuleOutcome::Pass),
                Some(HandleBehavior::Fail) => Err("handler exploded".into()),
                None => Ok(RuleOutcome::Pass),
            }
        }
    }

    // ─── Collaborator stubs ──────────────────────────────────────────────────

    #[derive(Default)]
    struct TestTransport {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for TestTransport {
        fn identity(&self) -> BotIdentity {
            BotIdentity {
                self_id: 10_000,
                alt_id: None,
            }
        }

        async fn send_group(
            &self,
            _group_id: i64,
            message: OutboundMessage,
        ) -> SendResult<MessageReceipt> {
            self.sent.lock().push(message.preview(300));
            Ok(MessageReceipt {
                message_id: "m".into(),
            })
        }

        async fn send_private(
            &self,
            _user_id: i64,
            message: OutboundMessage,
        ) -> SendResult<MessageReceipt> {
            self.sent.lock().push(message.preview(300));
            Ok(MessageReceipt {
                message_id: "m".into(),
            })
        }

        async fn recall(&self, _message_id: &str) -> SendResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct TestConfig {
        group: Mutex<GroupSettings>,
        access: Mutex<AccessSettings>,
        dialects: Vec<DialectSettings>,
    }

    impl ConfigProvider for TestConfig {
        fn bot(&self) -> BotSettings {
            BotSettings::default()
        }

        fn group(&self, _group_id: Option<i64>) -> GroupSettings {
            self.group.lock().clone()
        }

        fn access(&self) -> AccessSettings {
            self.access.lock().clone()
        }

        fn dialects(&self) -> Vec<DialectSettings> {
            self.dialects.clone()
        }
    }

    struct NullCounters;

    impl CounterStore for NullCounters {
        fn incr(&self, _metric: &str, _group_id: Option<i64>, _expire: Option<Duration>) {}
        fn reset(&self, _metric: &str, _group_id: Option<i64>) {}
    }

    struct SeededLoader {
        modules: Mutex<HashMap<String, Vec<PluginFactory>>>,
    }

    #[async_trait]
    impl ModuleLoader for SeededLoader {
        async fn load_module(
            &self,
            source: &PluginSource,
        ) -> Result<Vec<PluginFactory>, LoadError> {
            self.modules
                .lock()
                .get(&source.key)
                .cloned()
                .ok_or_else(|| LoadError::import(&source.key, "unknown module"))
        }
    }

    // ─── Fixture ─────────────────────────────────────────────────────────────

    struct Fixture {
        pipeline: DispatchPipeline,
        transport: Arc<TestTransport>,
        _dir: tempfile::TempDir,
    }

    async fn fixture_with(config: TestConfig, specs: Vec<ProbeSpec>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut modules = HashMap::new();
        for spec in specs {
            let key = format!("pack/{}.rs", spec.name);
            let path = dir.path().join(&key);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "").unwrap();
            let factories: Vec<PluginFactory> =
                vec![factory(move || ProbePlugin { spec: spec.clone() })];
            modules.insert(key, factories);
        }

        let config = Arc::new(config);
        let transport = Arc::new(TestTransport::default());
        let registry = Arc::new(PluginRegistry::new(
            dir.path(),
            Arc::new(SeededLoader {
                modules: Mutex::new(modules),
            }) as Arc<dyn ModuleLoader>,
            Arc::new(HookRegistry::new()),
            Arc::new(TaskScheduler::new()),
            Arc::new(NullCounters) as Arc<dyn CounterStore>,
            Arc::clone(&config) as Arc<dyn ConfigProvider>,
        ));
        registry.load(false).await;

        let pipeline = DispatchPipeline::new(
            registry,
            CooldownStore::new(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&config) as Arc<dyn ConfigProvider>,
            Arc::new(NullCounters) as Arc<dyn CounterStore>,
        );

        Fixture {
            pipeline,
            transport,
            _dir: dir,
        }
    }

    async fn fixture(specs: Vec<ProbeSpec>) -> Fixture {
        fixture_with(TestConfig::default(), specs).await
    }

    fn group_msg(user_id: i64, text: &str) -> RawEvent {
        RawEvent {
            kind: EventKind::Message,
            detail: "group".into(),
            sub_type: "normal".into(),
            user_id: Some(user_id),
            group_id: Some(100),
            group_name: Some("testers".into()),
            raw_message: text.into(),
            message: vec![Segment::Text { text: text.into() }],
            sender: Some(Sender {
                card: Some("Card".into()),
                nickname: Some("Nick".into()),
                role: Some(MemberRole::Member),
            }),
            ..Default::default()
        }
    }

    // ─── Rule phase ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn first_handled_rule_wins_across_plugins() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("first", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
            ProbeSpec::new("second", 200, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["first:go:-"]);
    }

    #[tokio::test]
    async fn priority_orders_evaluation_not_registration() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("late", 900, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
            ProbeSpec::new("early", 10, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["early:go:-"]);
    }

    #[tokio::test]
    async fn explicit_pass_falls_through_to_later_rules() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("first", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "soft"), HandleBehavior::Pass),
            ProbeSpec::new("second", 200, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "hard"), HandleBehavior::Handled),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["first:soft:-", "second:hard:-"]);
    }

    #[tokio::test]
    async fn rules_run_in_declaration_order_within_a_plugin() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("only", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd", "a"), HandleBehavior::Pass)
                .rule(Rule::new(r"^#cmd", "b"), HandleBehavior::Handled),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["only:a:-", "only:b:-"]);
    }

    #[tokio::test]
    async fn handler_error_stops_all_further_evaluation() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("first", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "boom"), HandleBehavior::Fail),
            ProbeSpec::new("second", 200, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["first:boom:-"]);
    }

    #[tokio::test]
    async fn rule_event_filter_skips_nonmatching_rules() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("only", 100, Arc::clone(&calls))
                .rule(
                    Rule::new(r"^#cmd$", "private_only").on("message.private"),
                    HandleBehavior::Handled,
                )
                .rule(
                    Rule::new(r"^#cmd$", "group_only").on("message.group"),
                    HandleBehavior::Handled,
                ),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["only:group_only:-"]);
    }

    // ─── Permission phase ────────────────────────────────────────────────────

    #[tokio::test]
    async fn permission_failure_aborts_every_remaining_rule() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("guarded", 100, Arc::clone(&calls)).rule(
                Rule::new(r"^#cmd$", "admin_thing").permission(Permission::Master),
                HandleBehavior::Handled,
            ),
            ProbeSpec::new("open", 200, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "anyone"), HandleBehavior::Handled),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert!(calls.lock().is_empty(), "no handler may run after a denial");
        let sent = fx.transport.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("only the bot master"));
    }

    #[tokio::test]
    async fn master_permission_passes_for_masters() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let config = TestConfig::default();
        config.access.lock().masters = vec![1];
        let fx = fixture_with(
            config,
            vec![ProbeSpec::new("guarded", 100, Arc::clone(&calls)).rule(
                Rule::new(r"^#cmd$", "admin_thing").permission(Permission::Master),
                HandleBehavior::Handled,
            )],
        )
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["guarded:admin_thing:-"]);
    }

    #[tokio::test]
    async fn admin_permission_accepts_owner_and_admin_roles() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![ProbeSpec::new("guarded", 100, Arc::clone(&calls)).rule(
            Rule::new(r"^#cmd$", "mod_thing").permission(Permission::Admin),
            HandleBehavior::Handled,
        )])
        .await;

        let mut event = group_msg(1, "#cmd");
        if let Some(sender) = event.sender.as_mut() {
            sender.role = Some(MemberRole::Owner);
        }
        fx.pipeline.dispatch(event).await;
        assert_eq!(calls.lock().as_slice(), ["guarded:mod_thing:-"]);
    }

    #[tokio::test]
    async fn missing_role_data_denies_with_notice() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![ProbeSpec::new("guarded", 100, Arc::clone(&calls)).rule(
            Rule::new(r"^#cmd$", "mod_thing").permission(Permission::Admin),
            HandleBehavior::Handled,
        )])
        .await;

        let mut event = group_msg(1, "#cmd");
        if let Some(sender) = event.sender.as_mut() {
            sender.role = None;
        }
        fx.pipeline.dispatch(event).await;
        assert!(calls.lock().is_empty());
        let sent = fx.transport.sent.lock().clone();
        assert!(sent[0].contains("still loading"));
    }

    // ─── Accept & context phases ─────────────────────────────────────────────

    #[tokio::test]
    async fn accept_take_stops_accept_phase_but_rules_proceed() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("taker", 100, Arc::clone(&calls))
                .accepting(AcceptOutcome::Take)
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
            ProbeSpec::new("watcher", 200, Arc::clone(&calls))
                .accepting(AcceptOutcome::Take),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        // The second accept never ran; rule matching still did.
        assert_eq!(calls.lock().as_slice(), ["taker:accept", "taker:go:-"]);
    }

    #[tokio::test]
    async fn accept_halt_stops_dispatch_entirely() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("halter", 100, Arc::clone(&calls))
                .accepting(AcceptOutcome::Halt),
            ProbeSpec::new("open", 200, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["halter:accept"]);
    }

    #[tokio::test]
    async fn context_claim_preempts_everything() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("talker", 100, Arc::clone(&calls))
                .with_context(ContextOutcome::Claimed),
            ProbeSpec::new("open", 200, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["talker:context"]);
    }

    #[tokio::test]
    async fn context_continue_lets_dispatch_proceed() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("talker", 100, Arc::clone(&calls))
                .with_context(ContextOutcome::Continue),
            ProbeSpec::new("open", 200, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["talker:context", "open:go:-"]);
    }

    // ─── Gates ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn guild_gate_drops_guild_events_when_disabled() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let config = TestConfig::default();
        config.access.lock().disable_guild_msg = true;
        let fx = fixture_with(
            config,
            vec![ProbeSpec::new("open", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled)],
        )
        .await;

        let mut event = group_msg(1, "#cmd");
        event.detail_type = Some("guild".into());
        fx.pipeline.dispatch(event).await;
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn mute_drops_group_events() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![ProbeSpec::new("open", 100, Arc::clone(&calls))
            .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled)])
        .await;

        let mut event = group_msg(1, "#cmd");
        event.group_mute_left = 30;
        fx.pipeline.dispatch(event).await;
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn duplicate_event_in_window_is_dropped() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![ProbeSpec::new("open", 100, Arc::clone(&calls))
            .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled)])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn group_cooldown_blocks_followup_until_expiry() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let config = TestConfig::default();
        config.group.lock().group_global_cd_ms = 1_000;
        let fx = fixture_with(
            config,
            vec![ProbeSpec::new("open", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd", "go"), HandleBehavior::Handled)],
        )
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd one")).await;
        // Different raw text so the duplicate throttle is not what stops it.
        fx.pipeline.dispatch(group_msg(2, "#cmd two")).await;
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn black_listed_user_is_dropped() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let config = TestConfig::default();
        config.access.lock().black_users = vec![1];
        let fx = fixture_with(
            config,
            vec![ProbeSpec::new("open", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled)],
        )
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        fx.pipeline.dispatch(group_msg(2, "#cmd")).await;
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn white_list_excludes_everyone_else() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let config = TestConfig::default();
        config.access.lock().white_groups = vec![999];
        let fx = fixture_with(
            config,
            vec![ProbeSpec::new("open", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled)],
        )
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn attention_gate_requires_alias_or_mention() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let config = TestConfig::default();
        {
            let mut group = config.group.lock();
            group.only_reply_at = AttentionMode::Required;
            group.bot_alias = vec!["botty".into()];
        }
        let fx = fixture_with(
            config,
            vec![ProbeSpec::new("open", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd", "go"), HandleBehavior::Handled)],
        )
        .await;

        // Unaddressed: dropped at the attention gate.
        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert!(calls.lock().is_empty());

        // Alias-prefixed: the alias is stripped and the rule matches.
        fx.pipeline.dispatch(group_msg(1, "botty #cmd")).await;
        assert_eq!(calls.lock().len(), 1);

        // Mentioning the bot also counts.
        let mut event = group_msg(1, "#cmd again");
        event.message.insert(
            0,
            Segment::At {
                qq: Some(10_000),
                id: None,
            },
        );
        fx.pipeline.dispatch(event).await;
        assert_eq!(calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn masters_exempt_mode_lets_masters_through() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let config = TestConfig::default();
        {
            let mut group = config.group.lock();
            group.only_reply_at = AttentionMode::MastersExempt;
            group.bot_alias = vec!["botty".into()];
        }
        config.access.lock().masters = vec![1];
        let fx = fixture_with(
            config,
            vec![ProbeSpec::new("open", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled)],
        )
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().len(), 1);
        fx.pipeline.dispatch(group_msg(2, "#cmd")).await;
        assert_eq!(calls.lock().len(), 1);
    }

    // ─── Candidate filters ───────────────────────────────────────────────────

    #[tokio::test]
    async fn event_scope_filters_candidates() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let fx = fixture(vec![
            ProbeSpec::new("notices", 100, Arc::clone(&calls))
                .scoped("notice")
                .rule(Rule::new(r".*", "any"), HandleBehavior::Handled),
            ProbeSpec::new("messages", 200, Arc::clone(&calls))
                .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
        ])
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["messages:go:-"]);
    }

    #[tokio::test]
    async fn group_disable_list_filters_candidates() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let config = TestConfig::default();
        config.group.lock().disable = vec!["muted-plugin".into()];
        let fx = fixture_with(
            config,
            vec![
                ProbeSpec::new("muted-plugin", 100, Arc::clone(&calls))
                    .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
                ProbeSpec::new("allowed", 200, Arc::clone(&calls))
                    .rule(Rule::new(r"^#cmd$", "go"), HandleBehavior::Handled),
            ],
        )
        .await;

        fx.pipeline.dispatch(group_msg(1, "#cmd")).await;
        assert_eq!(calls.lock().as_slice(), ["allowed:go:-"]);
    }

    // ─── Dialect normalization ───────────────────────────────────────────────

    #[tokio::test]
    async fn dialect_prefix_is_canonicalized_and_tagged() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let config = TestConfig {
            dialects: vec![DialectSettings {
                name: "alt".into(),
                trigger: r"^#?alt:".into(),
                canonical: "#main ".into(),
            }],
            ..Default::default()
        };
        let fx = fixture_with(
            config,
            vec![ProbeSpec::new("open", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#main status$", "status"), HandleBehavior::Handled)],
        )
        .await;

        fx.pipeline.dispatch(group_msg(1, "#alt:status")).await;
        // The handler saw the canonical prefix and the dialect tag.
        assert_eq!(calls.lock().as_slice(), ["open:status:alt"]);
    }

    #[tokio::test]
    async fn primary_dialect_stays_untagged() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let config = TestConfig {
            dialects: vec![DialectSettings {
                name: "alt".into(),
                trigger: r"^#?alt:".into(),
                canonical: "#main ".into(),
            }],
            ..Default::default()
        };
        let fx = fixture_with(
            config,
            vec![ProbeSpec::new("open", 100, Arc::clone(&calls))
                .rule(Rule::new(r"^#main status$", "status"), HandleBehavior::Handled)],
        )
        .await;

        fx.pipeline.dispatch(group_msg(1, "#main status")).await;
        assert_eq!(calls.lock().as_slice(), ["open:status:-"]);
    }
}
