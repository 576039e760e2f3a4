// Audit orchestrator for seedprobe
//
// audit(seed, options) walks every (element, format) unit of the current page:
//
//   PENDING → INJECTED → DISPATCHED → { MATCHED | UNMATCHED | FAILED }
//
// The redundancy filter gates INJECTED → DISPATCHED. Responses go through the
// built-in matcher (or a caller-supplied handler that replaces it), matches
// are logged to the session registry, and training feeds elements first seen
// in a response back in as new units with the same seed and options.

use crate::config::ScanConfig;
use crate::elements::{Element, ElementKind, Page};
use crate::error::{AuditError, Result, TransportError};
use crate::issue::{Issue, IssueElement};
use crate::matcher::{match_content, Pattern};
use crate::models::Response;
use crate::mutator::{format_seed, Format};
use crate::queue::{completion, DispatchQueue, RequestHandle};
use crate::redundancy::RedundancyKey;
use crate::response_analysis::is_soft_not_found;
use crate::session::ScanSession;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use url::Url;

/// Identity of the detection module driving an Auditor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    /// Name given to every issue the module logs
    pub issue_name: String,
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>, issue_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issue_name: issue_name.into(),
        }
    }
}

/// Caller-supplied analysis that replaces the built-in matcher and logging.
pub trait ResponseHandler: Send + Sync {
    fn handle(&self, response: &Response, element: &Element);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Injected,
    Dispatched,
    Matched,
    Unmatched,
    Failed,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitState::Pending => write!(f, "PENDING"),
            UnitState::Injected => write!(f, "INJECTED"),
            UnitState::Dispatched => write!(f, "DISPATCHED"),
            UnitState::Matched => write!(f, "MATCHED"),
            UnitState::Unmatched => write!(f, "UNMATCHED"),
            UnitState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Options for one audit() call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditOptions {
    pub formats: Vec<Format>,
    pub elements: Vec<ElementKind>,
    pub regexp: Option<String>,
    pub substring: Option<String>,
    /// With `regexp`: the matched fragment must equal this to count
    pub expected_match: Option<String>,
    pub train: bool,
    pub redundant: bool,
    pub is_async: bool,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            formats: Format::all(),
            elements: ElementKind::all(),
            regexp: None,
            substring: None,
            expected_match: None,
            train: true,
            redundant: false,
            is_async: true,
        }
    }
}

impl AuditOptions {
    pub fn with_formats(mut self, formats: &[Format]) -> Self {
        self.formats = formats.to_vec();
        self
    }

    pub fn with_elements(mut self, elements: &[ElementKind]) -> Self {
        self.elements = elements.to_vec();
        self
    }

    pub fn with_regexp(mut self, regexp: impl Into<String>) -> Self {
        self.regexp = Some(regexp.into());
        self
    }

    pub fn with_substring(mut self, substring: impl Into<String>) -> Self {
        self.substring = Some(substring.into());
        self
    }

    pub fn with_expected_match(mut self, expected: impl Into<String>) -> Self {
        self.expected_match = Some(expected.into());
        self
    }

    pub fn with_train(mut self, train: bool) -> Self {
        self.train = train;
        self
    }

    pub fn with_redundant(mut self, redundant: bool) -> Self {
        self.redundant = redundant;
        self
    }

    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }
}

/// Fields for a directly logged issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub id: String,
    pub injected: String,
    pub regexp: Option<String>,
    pub regexp_match: Option<String>,
    pub element: IssueElement,
}

enum Detector {
    Pattern {
        pattern: Pattern,
        expected: Option<String>,
    },
    Handler(Arc<dyn ResponseHandler>),
}

/// Validated, immutable form of one audit() call shared by all its units
struct AuditPlan {
    seed: String,
    formats: Vec<Format>,
    kinds: Vec<ElementKind>,
    detector: Detector,
    train: bool,
    redundant: bool,
    is_async: bool,
}

impl AuditPlan {
    fn resolve(
        seed: &str,
        options: AuditOptions,
        handler: Option<Arc<dyn ResponseHandler>>,
        config: &ScanConfig,
    ) -> Result<Self> {
        if options.formats.is_empty() {
            return Err(AuditError::InvalidOptions("no formats requested".to_string()));
        }
        if options.elements.is_empty() {
            return Err(AuditError::InvalidOptions(
                "no element kinds requested".to_string(),
            ));
        }

        let pattern = match (options.regexp, options.substring) {
            (Some(_), Some(_)) => {
                return Err(AuditError::InvalidOptions(
                    "regexp and substring are mutually exclusive".to_string(),
                ))
            }
            (Some(re), None) => Some(Pattern::regex(&re)?),
            (None, Some(sub)) => Some(Pattern::substring(sub)),
            (None, None) => None,
        };

        let detector = match handler {
            Some(handler) => Detector::Handler(handler),
            None => Detector::Pattern {
                pattern: pattern.unwrap_or_else(|| Pattern::substring(seed)),
                expected: options.expected_match,
            },
        };

        let mut kinds = Vec::new();
        for kind in options.elements {
            if config.audits(kind) && !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        Ok(Self {
            seed: seed.to_string(),
            formats: options.formats,
            kinds,
            detector,
            train: options.train,
            redundant: options.redundant,
            is_async: options.is_async,
        })
    }
}

/// Drives audits for one module against the current page.
///
/// Cheap to clone; clones share the page, session and queue.
#[derive(Clone)]
pub struct Auditor {
    info: Arc<ModuleInfo>,
    config: Arc<ScanConfig>,
    session: Arc<ScanSession>,
    queue: DispatchQueue,
    page: Arc<RwLock<Arc<Page>>>,
}

impl Auditor {
    pub fn new(
        info: ModuleInfo,
        page: Page,
        session: Arc<ScanSession>,
        queue: DispatchQueue,
        config: Arc<ScanConfig>,
    ) -> Self {
        let page = Arc::new(page);
        session.trainer.set_page(Arc::clone(&page));
        Self {
            info: Arc::new(info),
            config,
            session,
            queue,
            page: Arc::new(RwLock::new(page)),
        }
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    pub fn session(&self) -> &Arc<ScanSession> {
        &self.session
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    pub fn page(&self) -> Arc<Page> {
        self.page.read().clone()
    }

    /// Point the auditor at a new page; its elements become known to the scan
    pub fn set_page(&self, page: Page) {
        let page = Arc::new(page);
        self.session.trainer.set_page(Arc::clone(&page));
        *self.page.write() = page;
    }

    /// Wait for every outstanding request, including ones queued by training
    pub async fn run_all(&self) {
        self.queue.run_all().await;
    }

    /// Inject `seed` into every selected element of the page in every
    /// selected format, matching responses with the built-in matcher.
    ///
    /// Returns the number of units dispatched. Malformed patterns and
    /// unusable options are reported before anything is dispatched.
    pub async fn audit(&self, seed: &str, options: AuditOptions) -> Result<usize> {
        self.audit_inner(seed, options, None).await
    }

    /// Like [`Auditor::audit`], but every response goes to `handler`, which
    /// alone decides what, if anything, gets logged.
    pub async fn audit_with(
        &self,
        seed: &str,
        options: AuditOptions,
        handler: Arc<dyn ResponseHandler>,
    ) -> Result<usize> {
        self.audit_inner(seed, options, Some(handler)).await
    }

    async fn audit_inner(
        &self,
        seed: &str,
        options: AuditOptions,
        handler: Option<Arc<dyn ResponseHandler>>,
    ) -> Result<usize> {
        let plan = Arc::new(AuditPlan::resolve(seed, options, handler, &self.config)?);
        let elements = self.page().elements(&plan.kinds);
        Ok(self.audit_elements(elements, plan).await)
    }

    /// Train on `response` and audit every element it exposes that the scan
    /// has not seen, with `seed` and `options`.
    ///
    /// Returns the parsed page and the number of units dispatched for it.
    pub async fn train(
        &self,
        response: &Response,
        seed: &str,
        options: AuditOptions,
    ) -> Result<(Arc<Page>, usize)> {
        let plan = Arc::new(AuditPlan::resolve(seed, options, None, &self.config)?);
        Ok(self.train_with_plan(response, plan).await)
    }

    async fn train_with_plan(&self, response: &Response, plan: Arc<AuditPlan>) -> (Arc<Page>, usize) {
        let training = self.session.trainer.train(response, &plan.kinds);
        let elements = training.new_elements;

        let dispatched = if elements.is_empty() {
            0
        } else {
            self.audit_elements(elements, plan).await
        };
        (training.page, dispatched)
    }

    // Boxed: completions of these units may call back into it through training.
    fn audit_elements(&self, elements: Vec<Element>, plan: Arc<AuditPlan>) -> BoxFuture<'static, usize> {
        let auditor = self.clone();
        async move {
            let mut dispatched = 0;
            for element in &elements {
                for &format in &plan.formats {
                    let Some(handle) = auditor.dispatch_unit(element, format, &plan) else {
                        continue;
                    };
                    dispatched += 1;
                    if !plan.is_async {
                        handle.wait().await;
                    }
                }
            }
            dispatched
        }
        .boxed()
    }

    fn dispatch_unit(
        &self,
        element: &Element,
        format: Format,
        plan: &Arc<AuditPlan>,
    ) -> Option<RequestHandle> {
        trace!("{} {} ({})", UnitState::Pending, element.id(), format);

        let injected = format_seed(&plan.seed, &element.value, format);
        let mutated = element.with_injected_value(&injected);
        trace!("{} {} with {:?}", UnitState::Injected, mutated.id(), injected);

        let key = RedundancyKey::for_element(&mutated);
        if !self.session.filter.should_audit(key, plan.redundant) {
            debug!("Skipping redundant audit of {} with {:?}", mutated.id(), injected);
            return None;
        }

        let request = match mutated.to_request() {
            Ok(request) => request,
            Err(e) => {
                warn!("{} {}: {}", UnitState::Failed, mutated.id(), e);
                return None;
            }
        };

        trace!("{} {} {}", UnitState::Dispatched, request.method, request.url);
        let auditor = self.clone();
        let plan = Arc::clone(plan);
        Some(self.queue.dispatch(
            request,
            completion(move |result| async move {
                auditor.on_complete(result, mutated, plan).await;
            }),
        ))
    }

    async fn on_complete(
        &self,
        result: std::result::Result<Response, TransportError>,
        element: Element,
        plan: Arc<AuditPlan>,
    ) {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("{} {}: {}", UnitState::Failed, element.id(), e);
                return;
            }
        };

        match &plan.detector {
            Detector::Handler(handler) => handler.handle(&response, &element),
            Detector::Pattern { pattern, expected } => {
                let state = self.match_unit(&response, &element, pattern, expected.as_deref());
                trace!("{} {}", state, element.id());
            }
        }

        if plan.train {
            self.train_with_plan(&response, plan).await;
        }
    }

    fn match_unit(
        &self,
        response: &Response,
        element: &Element,
        pattern: &Pattern,
        expected: Option<&str>,
    ) -> UnitState {
        let Some(found) = match_content(&response.body, pattern) else {
            return UnitState::Unmatched;
        };
        if expected.is_some_and(|expected| expected != found.matched) {
            return UnitState::Unmatched;
        }

        info!(
            "[{}] {} in {} input '{}' at {}",
            self.info.name, self.info.issue_name, element.kind, element.name, response.url
        );

        let issue = self
            .new_issue(&response.url)
            .with_method(response.method)
            .with_element(element.kind.into())
            .with_input(element.name.clone(), element.current_value())
            .with_match(found.pattern, found.matched);
        self.session.registry.log(issue);
        UnitState::Matched
    }

    fn new_issue(&self, url: &str) -> Issue {
        let mut issue = Issue::new(self.info.issue_name.clone(), url);
        issue.mod_name = self.info.name.clone();
        issue
    }

    /// Append `issue`, filling in module identity where it is blank
    pub fn log_issue(&self, mut issue: Issue) {
        if issue.name.is_empty() {
            issue.name = self.info.issue_name.clone();
        }
        if issue.mod_name.is_empty() {
            issue.mod_name = self.info.name.clone();
        }
        self.session.registry.log(issue);
    }

    /// Append a batch of issues in order
    pub fn register_results(&self, issues: Vec<Issue>) {
        for issue in issues {
            self.log_issue(issue);
        }
    }

    /// Log an issue located by `response`, or by the current page without one.
    pub fn log(&self, opts: LogOptions, response: Option<&Response>) -> Issue {
        let page = self.page();
        let (url, method) = match response {
            Some(res) => (res.url.clone(), res.method),
            None => (page.url.clone(), page.method),
        };

        let mut issue = self
            .new_issue(&url)
            .with_method(method)
            .with_element(opts.element)
            .with_input(opts.id, opts.injected);
        if let Some(regexp) = opts.regexp {
            issue.opts.insert("regexp".to_string(), regexp.clone());
            issue.regexp = Some(regexp);
        }
        if let Some(matched) = opts.regexp_match {
            issue.opts.insert("match".to_string(), matched.clone());
            issue.regexp_match = Some(matched);
        }

        self.session.registry.log(issue.clone());
        issue
    }

    /// Match `content` (the current page body by default) and log a
    /// body-scoped issue on success.
    pub fn match_and_log(&self, pattern: &Pattern, content: Option<&str>) -> bool {
        let page = self.page();
        let content = content.unwrap_or(&page.body);
        let Some(found) = match_content(content, pattern) else {
            return false;
        };

        let issue = self
            .new_issue(&page.url)
            .with_method(page.method)
            .with_element(IssueElement::Body)
            .with_match(found.pattern, found.matched);
        self.session.registry.log(issue);
        true
    }

    /// Whether `response` shows an existing remote resource
    pub fn remote_file_exist(&self, response: &Response) -> bool {
        response.status == 200 && !is_soft_not_found(&response.body)
    }

    /// Log the resource behind `response` as a path-scoped issue
    pub fn log_remote_file(&self, response: &Response) {
        let file = last_path_segment(&response.url);
        info!(
            "[{}] {} at {}",
            self.info.name, self.info.issue_name, response.url
        );
        let issue = self
            .new_issue(&response.url)
            .with_method(response.method)
            .with_element(IssueElement::Path)
            .with_input(file.clone(), file);
        self.session.registry.log(issue);
    }

    /// Request `url` and log it if it exists; drained by [`Auditor::run_all`]
    pub fn log_remote_file_if_exists(&self, url: &str) -> RequestHandle {
        let auditor = self.clone();
        self.queue.get(
            url,
            completion(move |result| async move {
                match result {
                    Ok(response) if auditor.remote_file_exist(&response) => {
                        auditor.log_remote_file(&response)
                    }
                    Ok(response) => debug!("No remote file at {}", response.url),
                    Err(e) => warn!("Remote file probe failed: {}", e),
                }
            }),
        )
    }
}

fn last_path_segment(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => raw
            .split('?')
            .next()
            .and_then(|path| path.rsplit('/').next())
            .unwrap_or_default()
            .to_string(),
    }
}
