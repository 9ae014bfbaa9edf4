//! Public entry for the mr-annotator pipeline.
//!
//! Reconciles static-analysis findings against a GitLab revision in one
//! linear pass:
//!
//! 1) **Revision I/O** — resolve the project, fetch the merge request (or
//!    plain commit) diffs, and index their commentable positions.
//! 2) **Planning** — order the findings, decide inline vs. summary placement
//!    per finding, tally severities against the configured maxima.
//! 3) **Posting** — for every planned annotation ask the run-scoped duplicate
//!    guard whether an equal one already exists; post the rest.
//! 4) **Status** — fold the quality gate and the tallies into one
//!    (state, description) pair and hand it to the notification router.
//!
//! The pipeline is sequential: every remote call is awaited in order, there
//! is no internal parallelism, and the only run-scoped mutable state is the
//! duplicate guard's cache. Construct everything per run; nothing is shared
//! across runs.

pub mod artifacts;
pub mod config;
pub mod errors;
pub mod gitlab;
pub mod models;
pub mod notify;
pub mod order;
pub mod patch;
pub mod paths;
pub mod report;

use std::time::Instant;

use tracing::{debug, info, warn};

use config::{AnnotatorConfig, NotificationMode};
use errors::{AnnotateResult, Error};
use gitlab::GitlabClient;
use gitlab::guard::{DuplicateGuard, RevisionContext};
use gitlab::types::DiffRefs;
use models::AnalysisInput;
use paths::PathResolver;
use report::render::{MarkdownRenderer, RenderContext};
use report::status::RunStatus;
use report::{AnnotationPlan, DiffIndex};

/// Runs the whole pipeline once and routes the final status, converting any
/// run-level failure into the distinguished aborted status first so the
/// remote marker reflects it in commit-status mode.
///
/// This is the single public entry to call from a CLI or CI hook.
pub async fn execute(cfg: &AnnotatorConfig, input: AnalysisInput) -> AnnotateResult<RunStatus> {
    let client = GitlabClient::new(&cfg.gitlab)?;

    match run_annotation(cfg, &client, input).await {
        Ok(status) => {
            notify::dispatch(cfg, &client, &status).await?;
            Ok(status)
        }
        Err(e) => {
            let status =
                RunStatus::aborted(format!("failed to complete the review of this revision: {e}"));
            match notify::dispatch(cfg, &client, &status).await {
                // Exit-code mode turns the aborted status into its own fatal
                // error; the original failure is still the better diagnosis.
                Err(Error::RunFailed(_)) | Ok(()) => {}
                Err(push_err) => {
                    warn!("notify: could not deliver the failure status: {push_err}");
                }
            }
            Err(e)
        }
    }
}

/// Runs annotation for one revision and returns the aggregated status
/// without routing it.
pub async fn run_annotation(
    cfg: &AnnotatorConfig,
    client: &GitlabClient,
    input: AnalysisInput,
) -> AnnotateResult<RunStatus> {
    let t0 = Instant::now();

    debug!("run: resolve project");
    let project = client.get_project().await?;

    if cfg.notification_mode == NotificationMode::CommitStatus {
        client
            .post_commit_status(&cfg.gitlab, cfg.build_init_state.meaning(), "Analysis in progress")
            .await?;
    }

    // Revision context: an open merge request when an IID is configured,
    // otherwise the plain commit.
    debug!("run: fetch diffs");
    let (context, diffs, mr) = match cfg.gitlab.mr_iid {
        Some(iid) => {
            let mr = client.get_merge_request(iid).await?;
            let diffs = client.get_merge_request_diffs(iid).await?;
            let context = RevisionContext::MergeRequest {
                iid,
                base_sha: mr.diff_refs.base_sha.clone(),
                head_sha: mr.diff_refs.head_sha.clone(),
            };
            (context, diffs, Some((iid, mr.diff_refs)))
        }
        None => {
            let diffs = client.get_commit_diff(&cfg.gitlab.commit_sha).await?;
            let context = RevisionContext::Commit {
                sha: cfg.gitlab.commit_sha.clone(),
            };
            (context, diffs, None)
        }
    };

    let mut index = DiffIndex::new();
    for file in &diffs {
        if file.deleted_file {
            continue;
        }
        index.insert(file.new_path.clone(), patch::positions_from_patch(&file.diff)?);
    }
    debug!(
        "run: indexed {} file(s) in {} ms",
        index.len(),
        t0.elapsed().as_millis()
    );

    let revision = match &mr {
        Some((_, refs)) => refs.head_sha.clone(),
        None => cfg.gitlab.commit_sha.clone(),
    };
    let resolver = PathResolver::discover(&cfg.project_base_dir, cfg.prefix_directory.clone());
    let ctx = RenderContext {
        revision,
        analysis_url: cfg.analysis_url.clone(),
        project_web_url: Some(project.web_url),
    };

    let mut findings = input.findings;
    order::sort_findings(&mut findings);

    let plan = report::build_plan(cfg, &findings, &resolver, &index, &MarkdownRenderer, &ctx);
    info!(
        "run: planned {} inline annotation(s), summary={}, reported={}",
        plan.inline.len(),
        plan.summary.is_some(),
        plan.reported
    );

    post_annotations(cfg, client, &plan, context, mr.as_ref()).await?;

    let status = report::status::aggregate(&input.gate, &plan, cfg.fail_mode);

    artifacts::write_report(
        cfg.report_format,
        resolver.repo_root(),
        &findings,
        cfg.analysis_url.as_deref(),
    )?;

    info!(
        "run: done status={} in {} ms",
        status.state.name(),
        t0.elapsed().as_millis()
    );
    Ok(status)
}

/// Posts the planned annotations, consulting the duplicate guard before each
/// inline one.
async fn post_annotations(
    cfg: &AnnotatorConfig,
    client: &GitlabClient,
    plan: &AnnotationPlan,
    context: RevisionContext,
    mr: Option<&(u64, DiffRefs)>,
) -> AnnotateResult<()> {
    let mut guard = DuplicateGuard::new(client, context);

    let mut posted = 0usize;
    let mut skipped = 0usize;
    for annotation in &plan.inline {
        if guard.exists(&annotation.path, annotation.line, &annotation.body).await? {
            debug!(
                "post: skip duplicate {}:{}",
                annotation.path, annotation.line
            );
            skipped += 1;
            continue;
        }
        match mr {
            Some((iid, refs)) => {
                client
                    .create_discussion(*iid, &annotation.body, &annotation.path, annotation.line, refs)
                    .await?;
            }
            None => {
                client
                    .post_commit_comment(
                        &cfg.gitlab.commit_sha,
                        &annotation.body,
                        Some(&annotation.path),
                        Some(annotation.line),
                    )
                    .await?;
            }
        }
        posted += 1;
    }

    if let Some(summary) = &plan.summary {
        match mr {
            Some((iid, _)) => client.add_merge_request_note(*iid, summary).await?,
            None => {
                client
                    .post_commit_comment(&cfg.gitlab.commit_sha, summary, None, None)
                    .await?;
            }
        }
    }

    info!("post: {} inline posted, {} duplicate(s) skipped", posted, skipped);
    Ok(())
}

// -----------------------------------------------------------------------------
// Convenience re-exports for downstream users
// -----------------------------------------------------------------------------

pub use config::AnnotatorConfig as Config;
pub use models::{AnalysisInput as AnnotatorInput, Finding, Gate, Severity};
pub use report::status::{RunState, RunStatus as AnnotatorRunStatus};
