//! End-to-end tests for the command service

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use db::models::{automation_log::AutomationLog, project::Project, requirement::Requirement};
    use serde_json::json;

    use crate::{
        brain::{FailureCategory, ProviderError},
        config::CommandConfig,
        executor::OperationStatus,
        service::{CommandRequest, CommandService, ResponseOperations},
        test_utils::{call, create_member, create_project, setup_db, text, tool_calls, ScriptedProvider},
        CommandError,
    };

    fn build_service(db: &db::DBService, provider: ScriptedProvider) -> (CommandService, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let service = CommandService::new(db.pool.clone(), provider.clone(), CommandConfig::default());
        (service, provider)
    }

    fn instruction(text: &str) -> CommandRequest {
        CommandRequest {
            instruction: text.to_string(),
            ..Default::default()
        }
    }

    fn results(operations: &ResponseOperations) -> &[crate::executor::OperationResult] {
        match operations {
            ResponseOperations::Results(r) => r,
            ResponseOperations::Preview(_) => panic!("expected execution results"),
        }
    }

    #[tokio::test]
    async fn test_full_pipeline_threads_context_and_default_owner() {
        let db = setup_db().await;
        let admin = create_member(&db.pool, "Admin", Some("Owner")).await;
        let (service, _) = build_service(
            &db,
            ScriptedProvider::new(vec![tool_calls(vec![
                call("1", "create_project", json!({"name": "Q1"})),
                call("2", "create_requirement", json!({"name": "Kickoff", "dueDate": "2026-01-15"})),
            ])]),
        );

        let response = service
            .handle(instruction("create project Q1 with a kickoff task due Jan 15"))
            .await
            .expect("handled");

        assert!(response.success, "{}", response.message);
        assert_eq!(response.message, "Completed 2 operation(s) successfully.");
        assert!(response.log_id.is_some());

        let project = Project::find_by_name_case_insensitive(&db.pool, "q1")
            .await
            .expect("query")
            .expect("project");
        let requirements = Requirement::find_filtered(
            &db.pool,
            db::models::requirement::RequirementFilter {
                project_id: Some(project.id),
                ..Default::default()
            },
        )
        .await
        .expect("query");
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].name, "Kickoff");
        assert_eq!(requirements[0].owner_id, Some(admin.id));
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_going() {
        let db = setup_db().await;
        let (service, _) = build_service(
            &db,
            ScriptedProvider::new(vec![tool_calls(vec![
                call("1", "create_project", json!({"name": "Q1"})),
                call("2", "delete_project", json!({"projectId": uuid::Uuid::new_v4()})),
                call("3", "create_team_member", json!({"nickname": "Maria"})),
            ])]),
        );

        let response = service.handle(instruction("mixed bag")).await.expect("handled");
        let statuses: Vec<_> = results(&response.operations).iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![OperationStatus::Success, OperationStatus::Error, OperationStatus::Success]
        );
        assert!(!response.success);
        assert_eq!(response.message, "Completed 2 operation(s) successfully, 1 failed.");

        let log_id = response.log_id.expect("audited");
        let log = AutomationLog::find_by_id(&db.pool, log_id)
            .await
            .expect("query")
            .expect("row");
        assert_eq!((log.success_count, log.error_count), (2, 1));
    }

    #[tokio::test]
    async fn test_hello_is_a_no_op_not_an_error() {
        let db = setup_db().await;
        let (service, _) = build_service(&db, ScriptedProvider::new(vec![text("Hi! How can I help?")]));

        let response = service.handle(instruction("hello")).await.expect("handled");
        assert!(!response.success);
        assert!(response.operations.is_empty());
        assert_eq!(response.message, "Hi! How can I help?");

        // The no-op is still audited, as a failed invocation.
        let logs = AutomationLog::find_recent(&db.pool, 10).await.expect("logs");
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].success);
    }

    #[tokio::test]
    async fn test_read_round_resolves_existing_project_without_duplicating_it() {
        let db = setup_db().await;
        let ops = create_project(&db.pool, "Operations").await;
        let maria = create_member(&db.pool, "Maria", Some("Engineer")).await;
        let kickoff_id = {
            let engine = crate::executor::ExecutionEngine::new(&db.pool, "Admin");
            let seeded = engine
                .execute(&[call(
                    "seed",
                    "create_requirement",
                    json!({"name": "Kickoff", "projectId": ops.id}),
                )])
                .await;
            seeded[0].result.as_ref().expect("seeded")["id"]
                .as_str()
                .expect("id")
                .to_string()
        };

        // Round 1 looks up the Ops project's tasks, round 2 assigns.
        let (service, provider) = build_service(
            &db,
            ScriptedProvider::new(vec![
                tool_calls(vec![call(
                    "r1",
                    "list_requirements",
                    json!({"projectId": ops.id}),
                )]),
                tool_calls(vec![call(
                    "w1",
                    "update_requirement",
                    json!({"requirementId": kickoff_id, "ownerId": maria.id}),
                )]),
            ]),
        );

        let response = service
            .handle(instruction("assign the kickoff task in the Ops project to Maria"))
            .await
            .expect("handled");
        assert!(response.success, "{}", response.message);
        assert_eq!(results(&response.operations).len(), 1);

        // The dictionary offered "ops" as an alias of the existing project.
        let seen = provider.seen.lock().expect("lock");
        assert!(seen[0].messages[0].content.contains(&ops.id.to_string()));
        assert!(seen[0].messages[0].content.contains("ops"));
        drop(seen);

        assert_eq!(Project::find_all(&db.pool).await.expect("list").len(), 1);
        let updated = Requirement::find_by_id(
            &db.pool,
            uuid::Uuid::parse_str(&kickoff_id).expect("uuid"),
        )
        .await
        .expect("query")
        .expect("row");
        assert_eq!(updated.owner_id, Some(maria.id));
    }

    #[tokio::test]
    async fn test_preview_then_confirm_matches_fan_out_count() {
        let db = setup_db().await;
        let project = create_project(&db.pool, "Sprint 12").await;
        for (nickname, role) in [("Ana", "Engineer"), ("Bo", "Designer"), ("Cy", "Engineer")] {
            create_member(&db.pool, nickname, Some(role)).await;
        }

        let (service, provider) = build_service(
            &db,
            ScriptedProvider::new(vec![tool_calls(vec![call(
                "f1",
                "create_requirement_for_each_member",
                json!({"name": "Retro notes", "role": "engineer", "projectId": project.id}),
            )])]),
        );

        let preview = service
            .handle(CommandRequest {
                instruction: "every engineer writes retro notes".into(),
                preview_only: true,
                ..Default::default()
            })
            .await
            .expect("preview");

        assert!(preview.success);
        assert_eq!(preview.preview, Some(true));
        assert_eq!(preview.operations.len(), 2);
        assert!(preview.log_id.is_none());
        let plan = preview.plan.clone().expect("plan");
        assert_eq!(plan.len(), 1);

        // Nothing written by the preview.
        assert!(AutomationLog::find_recent(&db.pool, 10).await.expect("logs").is_empty());

        let executed = service
            .handle(CommandRequest {
                instruction: "every engineer writes retro notes".into(),
                confirmed_plan: Some(plan),
                ..Default::default()
            })
            .await
            .expect("execute");

        assert!(executed.success, "{}", executed.message);
        assert_eq!(executed.operations.len(), preview.operations.len());
        // The confirmed plan never goes back to the backend.
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_preview_with_no_fan_out_targets_is_not_a_success() {
        let db = setup_db().await;
        let project = create_project(&db.pool, "Sprint 12").await;
        create_member(&db.pool, "Bo", Some("Designer")).await;

        let (service, _) = build_service(
            &db,
            ScriptedProvider::new(vec![tool_calls(vec![call(
                "f1",
                "create_requirement_for_each_member",
                json!({"name": "Retro notes", "role": "engineer", "projectId": project.id}),
            )])]),
        );

        let preview = service
            .handle(CommandRequest {
                instruction: "every engineer writes retro notes".into(),
                preview_only: true,
                ..Default::default()
            })
            .await
            .expect("preview");

        assert!(!preview.success);
        assert_eq!(preview.preview, Some(true));
        assert_eq!(preview.operations.len(), 0);
        assert!(preview.plan.is_none());
        assert!(preview.log_id.is_none());
        assert!(AutomationLog::find_recent(&db.pool, 10).await.expect("logs").is_empty());
    }

    #[tokio::test]
    async fn test_confirmed_plan_is_deterministic() {
        let db = setup_db().await;
        create_member(&db.pool, "Ana", None).await;
        let (service, _) = build_service(&db, ScriptedProvider::new(Vec::new()));

        let plan = vec![
            call("1", "create_project", json!({"name": "Repeatable"})),
            call("2", "create_requirement_for_each_member", json!({"name": "Check-in"})),
            call("3", "update_requirement", json!({"requirementId": "nope"})),
        ];
        let request = || CommandRequest {
            confirmed_plan: Some(plan.clone()),
            ..Default::default()
        };

        let first = service.handle(request()).await.expect("first");
        let second = service.handle(request()).await.expect("second");

        let shape = |ops: &ResponseOperations| {
            results(ops)
                .iter()
                .map(|r| (r.operation_name.clone(), r.status))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&first.operations), shape(&second.operations));
        assert_eq!(first.operations.len(), 3);
    }

    #[tokio::test]
    async fn test_confirmed_plan_accepts_operation_name_aliases() {
        let db = setup_db().await;
        let (service, _) = build_service(&db, ScriptedProvider::new(Vec::new()));

        let request: CommandRequest = serde_json::from_value(json!({
            "instruction": "",
            "previewOnly": false,
            "confirmedPlan": [
                {"id": "1", "operationName": "create_project", "rawArguments": {"name": "Aliased"}}
            ]
        }))
        .expect("request json");

        let response = service.handle(request).await.expect("handled");
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_backend_failure_is_classified_and_audited() {
        let db = setup_db().await;
        let (service, _) = build_service(
            &db,
            ScriptedProvider::with_results(vec![Err(ProviderError::ApiError {
                status: 401,
                message: "invalid api key sk-123".into(),
            })]),
        );

        let response = service.handle(instruction("create Q1")).await.expect("handled");
        assert!(!response.success);
        assert_eq!(response.error_category, Some(FailureCategory::Authentication));
        assert!(!response.message.contains("sk-123"));
        assert!(response.error_detail.as_deref().unwrap_or("").contains("sk-123"));
        assert!(response.log_id.is_some());
        assert!(Project::find_all(&db.pool).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_backend_is_fatal() {
        let db = setup_db().await;
        let (service, _) = build_service(&db, ScriptedProvider::unconfigured());

        let err = service
            .handle(instruction("create Q1"))
            .await
            .expect_err("should fail");
        assert!(matches!(err, CommandError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_extra_rules_reach_the_backend() {
        let db = setup_db().await;
        let (service, provider) = build_service(&db, ScriptedProvider::new(vec![text("ok")]));

        service
            .handle(CommandRequest {
                instruction: "tidy up".into(),
                extra_rules: Some("Never create new projects.".into()),
                ..Default::default()
            })
            .await
            .expect("handled");

        let seen = provider.seen.lock().expect("lock");
        assert!(seen[0].messages[0].content.ends_with("Never create new projects."));
    }

    #[tokio::test]
    async fn test_empty_instruction_is_rejected() {
        let db = setup_db().await;
        let (service, provider) = build_service(&db, ScriptedProvider::new(Vec::new()));
        let err = service.handle(instruction("   ")).await.expect_err("should fail");
        assert!(matches!(err, CommandError::InvalidRequest(_)));
        assert_eq!(provider.request_count(), 0);
    }
}
