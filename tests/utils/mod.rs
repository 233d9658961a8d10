// Shared event-log fixtures for integration tests
//
// The two-node scenario: node 1 hosts App.csproj and its call-out task
// over [0s, 5s); node 2 hosts the requested Lib.csproj, served from cache
// over [1s, 4s), plus an earlier executed build of Lib.csproj whose span
// the caller chooses.

#![allow(dead_code)]

use buildstall::event::{BuildEvent, EventContext, SkipReason, Timestamp};

pub const NODE_A: i32 = 1;
pub const NODE_B: i32 = 2;
pub const TASK: i32 = 7;

pub fn ms(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

pub fn ctx(node: i32, eval: i32, context: i32) -> EventContext {
    EventContext::new().node(node).evaluation(eval).context(context)
}

/// Start, executed target, finish
pub fn executed_project(context: EventContext, file: &str, span: (i64, i64)) -> Vec<BuildEvent> {
    vec![
        BuildEvent::project_started(context, ms(span.0), file, "Build"),
        BuildEvent::target_started(context.target(1), ms(span.0), "Build"),
        BuildEvent::target_finished(context.target(1), ms(span.1), "Build"),
        BuildEvent::project_finished(context, ms(span.1)),
    ]
}

/// Start with a parent, cached target, finish
pub fn cached_project(
    context: EventContext,
    parent: EventContext,
    file: &str,
    span: (i64, i64),
) -> Vec<BuildEvent> {
    vec![
        BuildEvent::project_started(context, ms(span.0), file, "Build").with_parent(parent),
        BuildEvent::target_skipped(
            context,
            ms(span.0),
            "Build",
            SkipReason::PreviouslyBuiltSuccessfully,
        ),
        BuildEvent::project_finished(context, ms(span.1)),
    ]
}

pub fn call_out(owner: EventContext, span: (i64, i64), targets: &[&str]) -> Vec<BuildEvent> {
    let task = owner.task(TASK);
    vec![
        BuildEvent::task_started(task, ms(span.0), "MSBuild"),
        BuildEvent::task_input(task, ms(span.0), "Targets", targets.to_vec()),
        BuildEvent::task_finished(task, ms(span.1), "MSBuild"),
    ]
}

/// The two-node scenario, ordered by timestamp
pub fn two_node_scenario(earlier: (i64, i64)) -> Vec<BuildEvent> {
    let app = ctx(NODE_A, 1, 1);
    let mut events = executed_project(app, "src/App/App.csproj", (-20_000, 10_000));
    events.extend(call_out(app, (0, 5_000), &["Build"]));
    events.extend(cached_project(
        ctx(NODE_B, 2, 2),
        EventContext::new().context(1).task(TASK),
        "src/Lib/Lib.csproj",
        (1_000, 4_000),
    ));
    events.extend(executed_project(
        ctx(NODE_B, 3, 3),
        "src/Lib/Lib.csproj",
        earlier,
    ));
    events.sort_by_key(|event| event.timestamp);
    events
}

/// Serialize events as JSON Lines
pub fn to_jsonl(events: &[BuildEvent]) -> String {
    events
        .iter()
        .map(|event| serde_json::to_string(event).expect("serialize event") + "\n")
        .collect()
}
