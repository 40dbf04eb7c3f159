//! Integration tests for the board controller.
//!
//! The controller runs against an in-memory database wrapped in a gateway
//! that records every call and can be told to fail specific ones.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use taskboard::board::{BoardController, BoardDirectory, LoadState};
use taskboard::db::Database;
use taskboard::error::{BoardError, ErrorCode, GatewayError, GatewayResult};
use taskboard::gateway::PersistenceGateway;
use taskboard::reorder::{DragItem, DragOutcome};
use taskboard::types::{Board, Column, Position, Tag, Task};

/// Gateway wrapper that records calls and injects failures.
struct FlakyGateway {
    db: Database,
    calls: Mutex<Vec<&'static str>>,
    /// Operation name -> 1-based call numbers that fail. `0` fails every call.
    failures: Mutex<HashMap<&'static str, Vec<usize>>>,
    counts: Mutex<HashMap<&'static str, usize>>,
}

impl FlakyGateway {
    fn new(db: Database) -> Self {
        Self {
            db,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            counts: Mutex::new(HashMap::new()),
        }
    }

    fn fail(&self, op: &'static str, nth: usize) {
        self.failures.lock().unwrap().entry(op).or_default().push(nth);
    }

    fn heal(&self) {
        self.failures.lock().unwrap().clear();
    }

    fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
        self.counts.lock().unwrap().clear();
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn writes(&self) -> Vec<&'static str> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(*c, "get_board" | "list_boards" | "list_columns" | "list_tasks" | "list_tags"))
            .collect()
    }

    fn check(&self, op: &'static str) -> GatewayResult<()> {
        self.calls.lock().unwrap().push(op);
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(op).or_default();
        *count += 1;

        let failures = self.failures.lock().unwrap();
        match failures.get(op) {
            Some(nths) if nths.contains(&0) || nths.contains(count) => {
                Err(GatewayError::Storage(format!("injected {} failure", op)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PersistenceGateway for FlakyGateway {
    async fn get_board(&self, board_id: &str) -> GatewayResult<Board> {
        self.check("get_board")?;
        Ok(self.db.get_board(board_id)?)
    }

    async fn list_boards(&self, owner: &str) -> GatewayResult<Vec<Board>> {
        self.check("list_boards")?;
        Ok(self.db.list_boards(owner)?)
    }

    async fn insert_board(&self, owner: &str, title: &str) -> GatewayResult<Board> {
        self.check("insert_board")?;
        Ok(self.db.create_board(owner, title)?)
    }

    async fn update_board_title(&self, board_id: &str, title: &str) -> GatewayResult<()> {
        self.check("update_board_title")?;
        Ok(self.db.update_board_title(board_id, title)?)
    }

    async fn list_columns(&self, board_id: &str) -> GatewayResult<Vec<Column>> {
        self.check("list_columns")?;
        Ok(self.db.list_columns(board_id)?)
    }

    async fn insert_column(
        &self,
        board_id: &str,
        title: &str,
        position: Position,
    ) -> GatewayResult<Column> {
        self.check("insert_column")?;
        Ok(self.db.create_column(board_id, title, position)?)
    }

    async fn update_column_title(&self, column_id: &str, title: &str) -> GatewayResult<()> {
        self.check("update_column_title")?;
        Ok(self.db.update_column_title(column_id, title)?)
    }

    async fn update_column_position(
        &self,
        column_id: &str,
        position: Position,
    ) -> GatewayResult<()> {
        self.check("update_column_position")?;
        Ok(self.db.update_column_position(column_id, position)?)
    }

    async fn delete_column(&self, column_id: &str) -> GatewayResult<()> {
        self.check("delete_column")?;
        Ok(self.db.delete_column(column_id)?)
    }

    async fn list_tasks(&self, column_ids: &[String]) -> GatewayResult<Vec<Task>> {
        self.check("list_tasks")?;
        Ok(self.db.list_tasks(column_ids)?)
    }

    async fn insert_task(
        &self,
        column_id: &str,
        title: &str,
        position: Position,
    ) -> GatewayResult<Task> {
        self.check("insert_task")?;
        Ok(self.db.create_task(column_id, title, position)?)
    }

    async fn update_task_details(
        &self,
        task_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> GatewayResult<()> {
        self.check("update_task_details")?;
        Ok(self.db.update_task_details(task_id, title, description)?)
    }

    async fn update_task_position(&self, task_id: &str, position: Position) -> GatewayResult<()> {
        self.check("update_task_position")?;
        Ok(self.db.update_task_position(task_id, position)?)
    }

    async fn update_task_column(&self, task_id: &str, column_id: &str) -> GatewayResult<()> {
        self.check("update_task_column")?;
        Ok(self.db.move_task_to_column(task_id, column_id)?)
    }

    async fn delete_task(&self, task_id: &str) -> GatewayResult<()> {
        self.check("delete_task")?;
        Ok(self.db.delete_task(task_id)?)
    }

    async fn insert_tag(&self, name: &str, color: &str) -> GatewayResult<Tag> {
        self.check("insert_tag")?;
        Ok(self.db.create_tag(name, color)?)
    }

    async fn list_tags(&self) -> GatewayResult<Vec<Tag>> {
        self.check("list_tags")?;
        Ok(self.db.list_tags()?)
    }

    async fn attach_tag(&self, task_id: &str, tag_id: &str) -> GatewayResult<()> {
        self.check("attach_tag")?;
        Ok(self.db.attach_tag(task_id, tag_id)?)
    }

    async fn detach_tag(&self, task_id: &str, tag_id: &str) -> GatewayResult<()> {
        self.check("detach_tag")?;
        Ok(self.db.detach_tag(task_id, tag_id)?)
    }
}

/// A seeded board: columns A, B, C; tasks T1, T2 in A; D1 in C.
struct Fixture {
    gateway: Arc<FlakyGateway>,
    board_id: String,
    columns: Vec<String>,
    t1: String,
    t2: String,
    d1: String,
}

impl Fixture {
    fn new() -> Self {
        let db = Database::open_in_memory().expect("Failed to create in-memory database");
        let board = db.create_board("alice", "Sprint").unwrap();
        let columns: Vec<String> = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, title)| {
                db.create_column(&board.id, title, i as Position)
                    .unwrap()
                    .id
            })
            .collect();
        let t1 = db.create_task(&columns[0], "T1", 0).unwrap().id;
        let t2 = db.create_task(&columns[0], "T2", 1).unwrap().id;
        let d1 = db.create_task(&columns[2], "D1", 0).unwrap().id;

        Self {
            gateway: Arc::new(FlakyGateway::new(db)),
            board_id: board.id,
            columns,
            t1,
            t2,
            d1,
        }
    }

    async fn controller(&self) -> BoardController {
        let gateway: Arc<dyn PersistenceGateway> = self.gateway.clone();
        let controller = BoardController::open(gateway, &self.board_id)
            .await
            .expect("board loads");
        self.gateway.clear_calls();
        controller
    }

    fn stored_column_order(&self) -> Vec<(String, Position)> {
        self.gateway
            .db
            .list_columns(&self.board_id)
            .unwrap()
            .into_iter()
            .map(|c| (c.id, c.position))
            .collect()
    }

    fn stored_task(&self, task_id: &str) -> Task {
        self.gateway.db.get_task(task_id).unwrap()
    }
}

fn column_order(controller: &BoardController) -> Vec<String> {
    controller
        .state()
        .unwrap()
        .columns
        .iter()
        .map(|c| c.id.clone())
        .collect()
}

fn task_order(controller: &BoardController, column_id: &str) -> Vec<String> {
    controller
        .state()
        .unwrap()
        .tasks_in(column_id)
        .into_iter()
        .map(|t| t.id.clone())
        .collect()
}

mod reorder_tests {
    use super::*;

    #[tokio::test]
    async fn dragging_first_column_onto_second_swaps_them() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;
        let [a, b, c] = [&fx.columns[0], &fx.columns[1], &fx.columns[2]];

        controller.drag_start(DragItem::column(a)).unwrap();
        let outcome = controller.drag_end(Some(DragItem::column(b))).await.unwrap();

        assert!(matches!(outcome, DragOutcome::ReorderColumns { ref updates } if updates.len() == 2));
        assert_eq!(column_order(&controller), vec![b.clone(), a.clone(), c.clone()]);
        assert_eq!(
            fx.stored_column_order(),
            vec![(b.clone(), 0), (a.clone(), 1), (c.clone(), 2)]
        );
        assert_eq!(
            fx.gateway.writes(),
            vec!["update_column_position", "update_column_position"]
        );
    }

    #[tokio::test]
    async fn column_reorder_positions_are_dense() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;

        controller.drag_start(DragItem::column(&fx.columns[2])).unwrap();
        controller
            .drag_end(Some(DragItem::column(&fx.columns[0])))
            .await
            .unwrap();

        let positions: Vec<Position> = fx.stored_column_order().iter().map(|(_, p)| *p).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(
            column_order(&controller),
            vec![fx.columns[2].clone(), fx.columns[0].clone(), fx.columns[1].clone()]
        );
    }

    #[tokio::test]
    async fn dragging_task_onto_sibling_reorders_only_that_column() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;

        controller.drag_start(DragItem::task(&fx.t2)).unwrap();
        let outcome = controller.drag_end(Some(DragItem::task(&fx.t1))).await.unwrap();

        match outcome {
            DragOutcome::ReorderTasks { column_id, updates } => {
                assert_eq!(column_id, fx.columns[0]);
                assert!(updates.iter().all(|u| u.id == fx.t1 || u.id == fx.t2));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(task_order(&controller, &fx.columns[0]), vec![fx.t2.clone(), fx.t1.clone()]);
        assert_eq!(fx.stored_task(&fx.t2).position, 0);
        assert_eq!(fx.stored_task(&fx.t1).position, 1);
        assert_eq!(fx.stored_task(&fx.d1).position, 0);
        assert_eq!(
            fx.gateway.writes(),
            vec!["update_task_position", "update_task_position"]
        );
    }

    #[tokio::test]
    async fn dropping_on_self_persists_nothing() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;
        let before = controller.state().cloned();

        controller.drag_start(DragItem::column(&fx.columns[1])).unwrap();
        let outcome = controller
            .drag_end(Some(DragItem::column(&fx.columns[1])))
            .await
            .unwrap();

        assert_eq!(outcome, DragOutcome::NoOp);
        assert!(fx.gateway.calls().is_empty());
        assert_eq!(controller.state().cloned(), before);
    }

    #[tokio::test]
    async fn dropping_outside_discards_provisional_move() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;
        let before = controller.state().cloned();

        controller.drag_start(DragItem::task(&fx.t1)).unwrap();
        controller.drag_over(&DragItem::column(&fx.columns[2]));
        assert_eq!(
            controller.state().unwrap().task(&fx.t1).unwrap().column_id,
            fx.columns[2]
        );

        let outcome = controller.drag_end(None).await.unwrap();

        assert_eq!(outcome, DragOutcome::Cancelled);
        assert!(fx.gateway.calls().is_empty());
        assert_eq!(controller.state().cloned(), before);
        assert!(!controller.is_dragging());
    }

    #[tokio::test]
    async fn cross_column_move_updates_column_once_then_refetches() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;
        let done = &fx.columns[2];

        controller.drag_start(DragItem::task(&fx.t1)).unwrap();
        controller.drag_over(&DragItem::column(done));
        let outcome = controller.drag_end(Some(DragItem::column(done))).await.unwrap();

        assert!(matches!(outcome, DragOutcome::MoveTask { ref to_column, .. } if to_column == done));
        let calls = fx.gateway.calls();
        assert_eq!(calls[0], "update_task_column");
        assert_eq!(calls.iter().filter(|c| **c == "update_task_column").count(), 1);
        assert!(!calls.contains(&"update_task_position"));
        assert!(calls[1..].contains(&"get_board"));

        assert_eq!(task_order(&controller, done), vec![fx.d1.clone(), fx.t1.clone()]);
        assert_eq!(task_order(&controller, &fx.columns[0]), vec![fx.t2.clone()]);
        assert!(controller.state().unwrap().position_conflicts().is_empty());
    }

    #[tokio::test]
    async fn dropping_task_on_task_in_other_column_moves_it() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;

        controller.drag_start(DragItem::task(&fx.t2)).unwrap();
        let outcome = controller.drag_end(Some(DragItem::task(&fx.d1))).await.unwrap();

        assert!(matches!(outcome, DragOutcome::MoveTask { .. }));
        assert_eq!(fx.stored_task(&fx.t2).column_id, fx.columns[2]);
        assert!(controller.state().unwrap().position_conflicts().is_empty());
    }

    #[tokio::test]
    async fn second_drag_start_is_rejected() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;

        controller.drag_start(DragItem::column(&fx.columns[0])).unwrap();
        let err = controller
            .drag_start(DragItem::task(&fx.t1))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::GestureInProgress);

        // Structural edits wait for the gesture too.
        let err = controller.add_column("Later").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::GestureInProgress);
        assert!(fx.gateway.calls().is_empty());
    }
}

mod reconciliation_tests {
    use super::*;

    #[tokio::test]
    async fn failed_first_write_restores_stored_order() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;
        let stored_before = fx.stored_column_order();
        fx.gateway.fail("update_column_position", 1);

        controller.drag_start(DragItem::column(&fx.columns[0])).unwrap();
        controller
            .drag_end(Some(DragItem::column(&fx.columns[2])))
            .await
            .unwrap();

        assert_eq!(column_order(&controller), fx.columns);
        assert_eq!(fx.stored_column_order(), stored_before);
        assert_eq!(controller.load_state(), &LoadState::Ready);

        let notifications = controller.take_notifications();
        assert!(notifications.iter().any(|n| n.is_failure()));
    }

    #[tokio::test]
    async fn partial_write_failure_shows_what_storage_holds() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;
        fx.gateway.fail("update_column_position", 2);

        controller.drag_start(DragItem::column(&fx.columns[0])).unwrap();
        controller
            .drag_end(Some(DragItem::column(&fx.columns[2])))
            .await
            .unwrap();

        // The writes stop at the first failure.
        let attempted = fx
            .gateway
            .calls()
            .iter()
            .filter(|c| **c == "update_column_position")
            .count();
        assert_eq!(attempted, 2);

        let state = controller.state().unwrap();
        let local: Vec<(String, Position)> = state
            .columns
            .iter()
            .map(|c| (c.id.clone(), c.position))
            .collect();
        assert_eq!(local, fx.stored_column_order());
        assert!(!state.position_conflicts().is_empty());
    }

    #[tokio::test]
    async fn failed_move_reloads_and_keeps_task_in_place() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;
        fx.gateway.fail("update_task_column", 0);

        controller.drag_start(DragItem::task(&fx.t1)).unwrap();
        controller.drag_over(&DragItem::column(&fx.columns[1]));
        let outcome = controller
            .drag_end(Some(DragItem::column(&fx.columns[1])))
            .await
            .unwrap();

        assert!(matches!(outcome, DragOutcome::MoveTask { .. }));
        assert_eq!(
            controller.state().unwrap().task(&fx.t1).unwrap().column_id,
            fx.columns[0]
        );
        assert!(controller.notifications().iter().any(|n| n.is_failure()));
    }

    #[tokio::test]
    async fn failed_reload_blocks_until_retry() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;
        fx.gateway.fail("update_column_position", 0);
        fx.gateway.fail("get_board", 0);

        controller.drag_start(DragItem::column(&fx.columns[0])).unwrap();
        controller
            .drag_end(Some(DragItem::column(&fx.columns[1])))
            .await
            .unwrap();

        assert!(controller.state().is_none());
        assert!(matches!(controller.load_state(), LoadState::Failed { .. }));
        let err = controller.add_column("Blocked").await.unwrap_err();
        assert!(matches!(err, BoardError::NotLoaded));

        fx.gateway.heal();
        controller.refresh().await.unwrap();
        assert_eq!(controller.load_state(), &LoadState::Ready);
        assert_eq!(column_order(&controller), fx.columns);
    }

    #[tokio::test]
    async fn failed_insert_surfaces_error_without_refetch() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;
        fx.gateway.fail("insert_task", 0);

        let err = controller
            .add_task(&fx.columns[1], "Never saved")
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::PersistenceError);
        assert_eq!(fx.gateway.calls(), vec!["insert_task"]);
        assert!(task_order(&controller, &fx.columns[1]).is_empty());
        assert!(controller.notifications()[0].is_failure());
    }
}

mod edit_tests {
    use super::*;

    #[tokio::test]
    async fn blank_titles_never_reach_the_gateway() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;

        let err = controller.add_column("   ").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingRequiredField);
        let err = controller.add_task(&fx.columns[0], "").await.unwrap_err();
        assert_eq!(err.field(), Some("title"));
        let err = controller.rename_board("\t").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingRequiredField);

        assert!(fx.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn added_items_go_to_the_end() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;

        let column = controller.add_column("  Review ").await.unwrap();
        assert_eq!(column.title, "Review");
        assert_eq!(column.position, 3);

        let task = controller.add_task(&fx.columns[0], "T3").await.unwrap();
        assert_eq!(task.position, 2);
        assert_eq!(fx.stored_task(&task.id).position, 2);
    }

    #[tokio::test]
    async fn deleting_a_task_compacts_its_column() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;

        controller.delete_task(&fx.t1).await.unwrap();

        assert_eq!(task_order(&controller, &fx.columns[0]), vec![fx.t2.clone()]);
        assert_eq!(fx.stored_task(&fx.t2).position, 0);
        assert!(controller.state().unwrap().position_conflicts().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_column_renumbers_the_rest() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;

        controller.delete_column(&fx.columns[0]).await.unwrap();

        assert_eq!(
            fx.stored_column_order(),
            vec![(fx.columns[1].clone(), 0), (fx.columns[2].clone(), 1)]
        );
        assert!(controller.state().unwrap().task(&fx.t1).is_none());
    }

    #[tokio::test]
    async fn update_task_trims_and_clears_description() {
        let fx = Fixture::new();
        let mut controller = fx.controller().await;

        controller
            .update_task(&fx.t1, " Renamed ", Some(" notes "))
            .await
            .unwrap();
        assert_eq!(fx.stored_task(&fx.t1).description.as_deref(), Some("notes"));

        controller
            .update_task(&fx.t1, "Renamed", Some("   "))
            .await
            .unwrap();
        let task = fx.stored_task(&fx.t1);
        assert_eq!(task.title, "Renamed");
        assert!(task.description.is_none());
    }

    #[tokio::test]
    async fn tags_attach_and_detach() {
        let fx = Fixture::new();
        let gateway: Arc<dyn PersistenceGateway> = fx.gateway.clone();
        let directory = BoardDirectory::new(gateway, Vec::new());
        let tag = directory.create_tag("urgent", "#FFCC00").await.unwrap();
        let mut controller = fx.controller().await;

        controller.attach_tag(&fx.t1, &tag.id).await.unwrap();
        let local = controller.state().unwrap().task(&fx.t1).unwrap().tags.clone();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].color, "#ffcc00");
        assert_eq!(local[0].contrast_color(), "#000000");
        assert_eq!(fx.stored_task(&fx.t1).tags.len(), 1);

        controller.detach_tag(&fx.t1, &tag.id).await.unwrap();
        assert!(controller.state().unwrap().task(&fx.t1).unwrap().tags.is_empty());

        let err = controller.attach_tag(&fx.t1, "nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}

mod directory_tests {
    use super::*;

    #[tokio::test]
    async fn new_board_gets_default_columns() {
        let db = Database::open_in_memory().unwrap();
        let gateway: Arc<dyn PersistenceGateway> = Arc::new(db);
        let directory = BoardDirectory::new(
            Arc::clone(&gateway),
            vec!["To Do".into(), "In Progress".into(), "Done".into()],
        );

        let board = directory.create_board("alice", " Launch ").await.unwrap();
        assert_eq!(board.title, "Launch");

        let controller = BoardController::open(gateway, &board.id).await.unwrap();
        let titles: Vec<&str> = controller
            .state()
            .unwrap()
            .columns
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, vec!["To Do", "In Progress", "Done"]);

        assert_eq!(directory.list_boards("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let directory = BoardDirectory::new(Arc::new(db), Vec::new());

        let err = directory.create_board("", "Board").await.unwrap_err();
        assert_eq!(err.field(), Some("owner"));
        let err = directory.create_tag("bug", "#12345").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidFieldValue);
    }

    #[tokio::test]
    async fn find_tag_matches_id_or_name() {
        let db = Database::open_in_memory().unwrap();
        let directory = BoardDirectory::new(Arc::new(db), Vec::new());
        let tag = directory.create_tag("bug", "#ff0000").await.unwrap();

        assert_eq!(directory.find_tag("bug").await.unwrap().id, tag.id);
        assert_eq!(directory.find_tag(&tag.id).await.unwrap().name, "bug");
        assert!(matches!(
            directory.find_tag("feature").await.unwrap_err(),
            BoardError::NotFound { .. }
        ));
    }
}
