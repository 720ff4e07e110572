mod common;

use common::{fixture, T0};
use taskminder_core::{
    Category, NewTask, Priority, TaskPatch, TaskServiceError, TaskStatus, TaskValidationError,
    TimeRemaining,
};
use std::collections::HashSet;
use std::sync::Barrier;
use std::thread;
use uuid::Uuid;

#[test]
fn create_forces_todo_and_ignores_requested_status() {
    let fx = fixture();
    let mut input = NewTask::new("  Morning run  ", "Fitness", "high");
    input.status = Some("done".to_string());

    let task = fx.service.create(&input).unwrap();

    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.description, "Morning run");
    assert_eq!(task.category, Category::Fitness);
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.created_at, T0);
    assert_eq!(task.updated_at, T0);
    assert_eq!(fx.service.get(task.id).unwrap(), task);
}

#[test]
fn create_rejects_invalid_input_without_touching_store() {
    let fx = fixture();

    let blank = fx.service.create(&NewTask::new("   ", "Work", "low"));
    assert!(matches!(
        blank,
        Err(TaskServiceError::Validation(TaskValidationError::EmptyDescription))
    ));

    let bad_category = fx.service.create(&NewTask::new("x", "Hobby", "low"));
    assert!(matches!(
        bad_category,
        Err(TaskServiceError::Validation(TaskValidationError::UnknownCategory(_)))
    ));

    let bad_priority = fx.service.create(&NewTask::new("x", "Work", "urgent"));
    assert!(matches!(
        bad_priority,
        Err(TaskServiceError::Validation(TaskValidationError::UnknownPriority(_)))
    ));

    assert_eq!(fx.store.calls(), 0);
}

#[test]
fn setting_done_twice_still_advances_updated_at() {
    let fx = fixture();
    let task = fx
        .service
        .create(&NewTask::new("Report", "Work", "medium"))
        .unwrap();

    let first = fx.service.set_status(task.id, "done").unwrap();
    assert_eq!(first.status, TaskStatus::Done);
    assert!(first.updated_at > task.updated_at);

    // Clock has not moved; the write must still be observable.
    let second = fx.service.set_status(task.id, "done").unwrap();
    assert_eq!(second.status, TaskStatus::Done);
    assert!(second.updated_at > first.updated_at);

    fx.clock.advance(60_000);
    let third = fx.service.set_status(task.id, "done").unwrap();
    assert_eq!(third.updated_at, T0 + 60_000);
}

#[test]
fn any_status_can_move_to_any_other() {
    let fx = fixture();
    let task = fx
        .service
        .create(&NewTask::new("Stretch", "Fitness", "low"))
        .unwrap();

    let done = fx.service.set_status(task.id, "done").unwrap();
    assert_eq!(done.status, TaskStatus::Done);

    let reopened = fx.service.set_status(task.id, "todo").unwrap();
    assert_eq!(reopened.status, TaskStatus::Todo);

    let doing = fx.service.set_status(task.id, "in-progress").unwrap();
    assert_eq!(doing.status, TaskStatus::InProgress);
    assert_eq!(
        fx.service.get(task.id).unwrap().status,
        TaskStatus::InProgress
    );
}

#[test]
fn set_status_on_unknown_id_is_not_found_and_writes_nothing() {
    let fx = fixture();
    let missing = Uuid::new_v4();

    let err = fx.service.set_status(missing, "done").unwrap_err();

    assert!(matches!(err, TaskServiceError::NotFound(id) if id == missing));
    assert_eq!(fx.store.writes(), 0);
}

#[test]
fn invalid_status_is_rejected_before_any_store_call() {
    let fx = fixture();
    let task = fx
        .service
        .create(&NewTask::new("Groceries", "Personal", "low"))
        .unwrap();
    let calls_after_create = fx.store.calls();

    let err = fx.service.set_status(task.id, "archived").unwrap_err();

    assert!(matches!(
        err,
        TaskServiceError::Validation(TaskValidationError::UnknownStatus(value)) if value == "archived"
    ));
    assert_eq!(fx.store.calls(), calls_after_create);
    assert_eq!(fx.service.get(task.id).unwrap().status, TaskStatus::Todo);
}

#[test]
fn pending_never_returns_done_tasks() {
    let fx = fixture();
    let a = fx.service.create(&NewTask::new("a", "Work", "low")).unwrap();
    fx.clock.advance(1);
    let b = fx.service.create(&NewTask::new("b", "Work", "low")).unwrap();
    fx.clock.advance(1);
    let c = fx.service.create(&NewTask::new("c", "Work", "low")).unwrap();

    fx.service.set_status(b.id, "in-progress").unwrap();
    fx.service.set_status(c.id, "done").unwrap();

    let pending = fx.service.pending().unwrap();
    let ids: Vec<_> = pending.iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
    assert!(pending.iter().all(|task| task.status != TaskStatus::Done));

    let done = fx.service.list_by_status(&[TaskStatus::Done]).unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, c.id);

    assert!(fx.service.list_by_status(&[]).unwrap().is_empty());
}

#[test]
fn update_fields_applies_only_present_fields() {
    let fx = fixture();
    let task = fx
        .service
        .create(&NewTask::new("Plan trip", "Personal", "low").with_deadline(T0 + 86_400_000))
        .unwrap();

    fx.clock.advance(5_000);
    let patch = TaskPatch {
        priority: Some("high".to_string()),
        ..TaskPatch::default()
    };
    let updated = fx.service.update_fields(task.id, &patch).unwrap();
    assert_eq!(updated.priority, Priority::High);
    assert_eq!(updated.description, "Plan trip");
    assert_eq!(updated.category, Category::Personal);
    assert_eq!(updated.deadline, Some(T0 + 86_400_000));
    assert_eq!(updated.status, TaskStatus::Todo);
    assert_eq!(updated.updated_at, T0 + 5_000);

    let clear: TaskPatch = serde_json::from_str(r#"{"deadline": null}"#).unwrap();
    let cleared = fx.service.update_fields(task.id, &clear).unwrap();
    assert_eq!(cleared.deadline, None);
    assert_eq!(cleared.priority, Priority::High);
    assert!(cleared.updated_at > updated.updated_at);
}

#[test]
fn update_fields_rejects_bad_values_and_unknown_ids() {
    let fx = fixture();
    let task = fx
        .service
        .create(&NewTask::new("Write tests", "Work", "medium"))
        .unwrap();

    let blank = TaskPatch {
        description: Some("  ".to_string()),
        ..TaskPatch::default()
    };
    assert!(matches!(
        fx.service.update_fields(task.id, &blank),
        Err(TaskServiceError::Validation(TaskValidationError::EmptyDescription))
    ));

    let missing = Uuid::new_v4();
    assert!(matches!(
        fx.service.update_fields(missing, &TaskPatch::default()),
        Err(TaskServiceError::NotFound(id)) if id == missing
    ));
    assert_eq!(fx.service.get(task.id).unwrap(), task);
}

#[test]
fn delete_removes_task_and_later_lookups_are_not_found() {
    let fx = fixture();
    let task = fx
        .service
        .create(&NewTask::new("Old chore", "Personal", "low"))
        .unwrap();

    fx.service.delete(task.id).unwrap();

    assert!(matches!(
        fx.service.get(task.id),
        Err(TaskServiceError::NotFound(_))
    ));
    assert!(matches!(
        fx.service.delete(task.id),
        Err(TaskServiceError::NotFound(_))
    ));
    assert!(fx.service.pending().unwrap().is_empty());
}

#[test]
fn advance_walks_the_board_and_stops_at_done() {
    let fx = fixture();
    let task = fx
        .service
        .create(&NewTask::new("Ship it", "Work", "high"))
        .unwrap();

    assert_eq!(
        fx.service.advance(task.id).unwrap().status,
        TaskStatus::InProgress
    );
    assert_eq!(fx.service.advance(task.id).unwrap().status, TaskStatus::Done);

    let err = fx.service.advance(task.id).unwrap_err();
    assert!(matches!(
        err,
        TaskServiceError::Validation(TaskValidationError::AlreadyDone(id)) if id == task.id
    ));
}

#[test]
fn time_remaining_tracks_the_clock() {
    let fx = fixture();
    let task = fx
        .service
        .create(&NewTask::new("Pay rent", "Personal", "high").with_deadline(T0 + 3_600_000))
        .unwrap();
    let open = fx
        .service
        .create(&NewTask::new("Someday", "Personal", "low"))
        .unwrap();

    let before = task.time_remaining(fx.service.now_ms());
    assert!(matches!(before, TimeRemaining::Remaining(_)));
    assert_eq!(before.label().as_deref(), Some("1h 0m"));

    fx.clock.advance(3_600_000);
    assert_eq!(
        taskminder_core::time_remaining(&task, fx.service.now_ms()),
        TimeRemaining::Overdue
    );
    assert_eq!(
        open.time_remaining(fx.service.now_ms()),
        TimeRemaining::NoDeadline
    );
}

#[test]
fn stats_reflect_board_state() {
    let fx = fixture();
    let run = fx.service.create(&NewTask::new("Run", "Fitness", "low")).unwrap();
    let deck = fx.service.create(&NewTask::new("Deck", "Work", "high")).unwrap();
    let _mail = fx
        .service
        .create(&NewTask::new("Mail", "Personal", "medium"))
        .unwrap();

    fx.service.set_status(run.id, "done").unwrap();
    fx.service.set_status(deck.id, "in-progress").unwrap();

    let board = fx.service.board_stats().unwrap();
    assert_eq!(board.total, 3);
    assert_eq!(board.in_progress, 1);
    assert_eq!(board.done, 1);
    assert_eq!(board.progress_percent, 33);

    let monthly = fx.service.monthly_stats().unwrap();
    assert_eq!(monthly.total, 3);
    assert_eq!(monthly.completed, 1);
    assert_eq!(monthly.by_category.get(Category::Fitness), 1);
    assert_eq!(monthly.by_category.get(Category::Work), 0);
}

#[test]
fn concurrent_mutations_of_one_task_are_never_lost() {
    const ROUNDS: i64 = 25;

    let fx = fixture();
    let task = fx
        .service
        .create(&NewTask::new("old", "Personal", "low"))
        .unwrap();
    let barrier = Barrier::new(4);

    let stamps: Vec<i64> = thread::scope(|scope| {
        let describe = scope.spawn(|| {
            barrier.wait();
            (0..ROUNDS)
                .map(|round| {
                    let patch = TaskPatch {
                        description: Some(format!("new-{round}")),
                        ..TaskPatch::default()
                    };
                    fx.service.update_fields(task.id, &patch).unwrap().updated_at
                })
                .collect::<Vec<_>>()
        });
        let reschedule = scope.spawn(|| {
            barrier.wait();
            (0..ROUNDS)
                .map(|round| {
                    let patch = TaskPatch {
                        deadline: Some(Some(T0 + round)),
                        ..TaskPatch::default()
                    };
                    fx.service.update_fields(task.id, &patch).unwrap().updated_at
                })
                .collect::<Vec<_>>()
        });
        let reprioritize = scope.spawn(|| {
            barrier.wait();
            (0..ROUNDS)
                .map(|round| {
                    let priority = if round % 2 == 0 { "medium" } else { "high" };
                    let patch = TaskPatch {
                        priority: Some(priority.to_string()),
                        ..TaskPatch::default()
                    };
                    fx.service.update_fields(task.id, &patch).unwrap().updated_at
                })
                .collect::<Vec<_>>()
        });
        let finish = scope.spawn(|| {
            barrier.wait();
            (0..ROUNDS)
                .map(|round| {
                    let status = if round + 1 == ROUNDS { "done" } else { "in-progress" };
                    fx.service.set_status(task.id, status).unwrap().updated_at
                })
                .collect::<Vec<_>>()
        });

        [describe, reschedule, reprioritize, finish]
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    let stored = fx.service.get(task.id).unwrap();
    assert_eq!(stored.description, format!("new-{}", ROUNDS - 1));
    assert_eq!(stored.deadline, Some(T0 + ROUNDS - 1));
    assert_eq!(stored.priority, Priority::Medium);
    assert_eq!(stored.status, TaskStatus::Done);

    // Clock never moved, so each mutation had to take its own +1 ms slot.
    let distinct: HashSet<i64> = stamps.iter().copied().collect();
    assert_eq!(distinct.len(), stamps.len());
    assert_eq!(stored.updated_at, T0 + 4 * ROUNDS);
    assert_eq!(stamps.iter().max(), Some(&stored.updated_at));
}
