#[cfg(test)]
mod tests {
    use crate::api::HealthResponse;
    use crate::models::{Achievement, Category, Job, Project, Technology};
    use crate::test::test_utils::{TestDbBuilder, create_standard_test_db, setup_test_client};
    use crate::validation::ToValidationResponse;
    use rocket::http::{ContentType, Status};
    use serde_json::{Value, json};

    #[rocket::async_test]
    async fn test_health_on_empty_database() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let (client, _) = setup_test_client(test_db).await;

        let response = client.get("/api/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body: HealthResponse = response.into_json().await.unwrap();
        assert_eq!(body.status, "ok");
    }

    #[rocket::async_test]
    async fn test_trailing_slash_is_normalized() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let response = client.get("/api/jobs/").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let jobs: Vec<Job> = response.into_json().await.unwrap();
        assert_eq!(jobs.len(), 2);
    }

    #[rocket::async_test]
    async fn test_get_category_hierarchy() {
        let test_db = create_standard_test_db().await;
        let id = test_db.category_id("Programming");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .get(format!("/api/categories/{}", id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["name"], "Programming");
        assert_eq!(body["subcategories"][0]["name"], "Web Development");
        assert_eq!(body["subcategories"][0]["category"], id);
        assert_eq!(
            body["subcategories"][0]["technologies"][0]["name"],
            "Python"
        );
    }

    #[rocket::async_test]
    async fn test_missing_entity_returns_404_json() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let (client, _) = setup_test_client(test_db).await;

        for path in [
            "/api/categories/1",
            "/api/subcategories/1",
            "/api/technologies/1",
            "/api/projects/1",
            "/api/jobs/1",
            "/api/achievements/1",
        ] {
            let response = client.get(path).dispatch().await;
            assert_eq!(response.status(), Status::NotFound, "{}", path);

            let body: Value = response.into_json().await.unwrap();
            assert_eq!(body["status"], "error", "{}", path);
        }
    }

    #[rocket::async_test]
    async fn test_create_category_returns_201() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/categories")
            .header(ContentType::JSON)
            .body(json!({ "name": "Languages" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let category: Category = response.into_json().await.unwrap();
        assert_eq!(category.name, "Languages");
        assert!(category.subcategories.is_empty());
    }

    #[rocket::async_test]
    async fn test_validation_errors_are_per_field() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/projects")
            .header(ContentType::JSON)
            .body(
                json!({
                    "name": "A name that is far too long",
                    "description": "x",
                    "github": "not a url",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["status"], "error");
        assert!(body["errors"]["name"].is_array());
        assert!(body["errors"]["github"].is_array());
        assert!(body["errors"].get("description").is_none());
    }

    #[rocket::async_test]
    async fn test_malformed_json_is_400() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/categories")
            .header(ContentType::JSON)
            .body("{ not json")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let body: Value = response.into_json().await.unwrap();
        assert!(body["errors"]["non_field_errors"].is_array());
    }

    #[rocket::async_test]
    async fn test_create_project_embeds_technology() {
        let test_db = create_standard_test_db().await;
        let python = test_db.technology_id("Python");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/projects")
            .header(ContentType::JSON)
            .body(
                json!({
                    "name": "Scraper",
                    "description": "Collects things",
                    "github": "https://github.com/example/scraper",
                    "technology": [python],
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let created: Project = response.into_json().await.unwrap();

        let response = client
            .get(format!("/api/projects/{}", created.id))
            .dispatch()
            .await;
        let project: Project = response.into_json().await.unwrap();

        assert_eq!(project.technology.len(), 1);
        assert_eq!(project.technology[0].id, python);
        assert_eq!(project.technology[0].name, "Python");
        assert_eq!(project.category, vec!["Programming".to_string()]);
    }

    #[rocket::async_test]
    async fn test_projects_filtered_by_category_query() {
        let test_db = create_standard_test_db().await;
        let programming = test_db.category_id("Programming");
        let (client, _) = setup_test_client(test_db).await;

        let response = client.get("/api/projects?category=Tools").dispatch().await;
        let projects: Vec<Project> = response.into_json().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Portfolio");

        let response = client
            .get(format!("/api/categories/{}/projects", programming))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let projects: Vec<Project> = response.into_json().await.unwrap();
        assert_eq!(projects[0].name, "Portfolio");
    }

    #[rocket::async_test]
    async fn test_subcategory_technologies_route() {
        let test_db = create_standard_test_db().await;
        let id = test_db.subcategory_id("Web Development");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .get(format!("/api/subcategories/{}/technologies", id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let technologies: Vec<Technology> = response.into_json().await.unwrap();
        let names: Vec<&str> = technologies.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Python", "Rust"]);
    }

    #[rocket::async_test]
    async fn test_current_job_end_date_is_null_over_http() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/jobs")
            .header(ContentType::JSON)
            .body(
                json!({
                    "company": "Acme",
                    "title": "Engineer",
                    "link": "",
                    "start_date": "2022-01-01",
                    "end_date": "2023-01-01",
                    "is_current": true,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["end_date"], Value::Null);
        assert_eq!(body["is_current"], true);
        assert_eq!(body["link"], "");
    }

    #[rocket::async_test]
    async fn test_patch_job_keeps_unsent_fields() {
        let test_db = create_standard_test_db().await;
        let id = test_db.job_id("Intern");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .patch(format!("/api/jobs/{}", id))
            .header(ContentType::JSON)
            .body(json!({ "is_current": true }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let job: Job = response.into_json().await.unwrap();
        assert!(job.is_current);
        assert_eq!(job.end_date, None);
        assert_eq!(job.company, "Initech");
        assert_eq!(job.technologies[0].name, "Python");
    }

    #[rocket::async_test]
    async fn test_achievement_requires_job() {
        let test_db = create_standard_test_db().await;
        let job_id = test_db.job_id("Engineer");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/achievements")
            .header(ContentType::JSON)
            .body(json!({ "description": "Led the migration" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: Value = response.into_json().await.unwrap();
        assert!(body["errors"]["job"].is_array());

        let response = client
            .post("/api/achievements")
            .header(ContentType::JSON)
            .body(json!({ "description": "Led the migration", "job": 999 }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: Value = response.into_json().await.unwrap();
        assert!(body["errors"]["job"].is_array());

        let response = client
            .post("/api/achievements")
            .header(ContentType::JSON)
            .body(json!({ "description": "Led the migration", "job": job_id }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let created: Achievement = response.into_json().await.unwrap();

        let response = client
            .get(format!("/api/achievements/{}", created.id))
            .dispatch()
            .await;
        let achievement: Achievement = response.into_json().await.unwrap();
        assert_eq!(achievement.job, job_id);
    }

    #[rocket::async_test]
    async fn test_delete_returns_204_and_cascades() {
        let test_db = create_standard_test_db().await;
        let id = test_db.category_id("Programming");
        let (client, test_db) = setup_test_client(test_db).await;

        let response = client
            .delete(format!("/api/categories/{}", id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NoContent);

        let response = client
            .get(format!("/api/categories/{}", id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        assert_eq!(test_db.count_rows("subcategories").await, 1);
    }

    #[rocket::async_test]
    async fn test_put_replaces_subcategory() {
        let test_db = create_standard_test_db().await;
        let id = test_db.subcategory_id("Editors");
        let programming = test_db.category_id("Programming");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .put(format!("/api/subcategories/{}", id))
            .header(ContentType::JSON)
            .body(json!({ "name": "IDEs", "category": programming }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["name"], "IDEs");
        assert_eq!(body["category"], programming);
        assert_eq!(body["technologies"][0]["name"], "Neovim");
    }

    #[rocket::async_test]
    async fn test_jobs_filtered_by_technology_query() {
        let test_db = create_standard_test_db().await;
        let python = test_db.technology_id("Python");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .get(format!("/api/jobs?technology={}", python))
            .dispatch()
            .await;
        let jobs: Vec<Job> = response.into_json().await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Intern");
    }

    #[test]
    fn test_status_responses_keep_json_shape() {
        let response = Status::UnprocessableEntity.to_validation_response();
        assert_eq!(response.0, Status::BadRequest);
        assert!(response.1.errors.contains_key("non_field_errors"));

        let response = Status::Forbidden.to_validation_response();
        assert_eq!(response.0, Status::Forbidden);
        assert!(response.1.errors.contains_key("permission"));

        let response = Status::Unauthorized.to_validation_response();
        assert!(response.1.errors.contains_key("authentication"));

        let response = Status::NotFound.to_validation_response();
        assert!(response.1.errors.contains_key("resource"));
    }

    #[rocket::async_test]
    async fn test_wrongly_typed_field_is_reported_under_its_name() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/achievements")
            .header(ContentType::JSON)
            .body(json!({ "description": "x", "job": "abc" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let body: Value = response.into_json().await.unwrap();
        assert!(body["errors"]["job"].is_array());
        assert!(body["errors"].get("non_field_errors").is_none());
    }

    #[rocket::async_test]
    async fn test_type_and_validation_errors_are_reported_together() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let (client, test_db) = setup_test_client(test_db).await;

        let response = client
            .post("/api/jobs")
            .header(ContentType::JSON)
            .body(
                json!({
                    "company": "",
                    "title": "t",
                    "start_date": "not-a-date",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let body: Value = response.into_json().await.unwrap();
        assert!(body["errors"]["company"].is_array());
        assert!(body["errors"]["start_date"].is_array());
        assert!(body["errors"].get("title").is_none());
        assert_eq!(test_db.count_rows("jobs").await, 0);
    }

    #[rocket::async_test]
    async fn test_patch_with_wrong_type_names_the_field() {
        let test_db = create_standard_test_db().await;
        let id = test_db.job_id("Intern");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .patch(format!("/api/jobs/{}", id))
            .header(ContentType::JSON)
            .body(json!({ "is_current": "sometimes" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let body: Value = response.into_json().await.unwrap();
        assert!(body["errors"]["is_current"].is_array());
    }

    #[rocket::async_test]
    async fn test_project_github_must_be_a_web_link() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let (client, test_db) = setup_test_client(test_db).await;

        for github in ["javascript:alert(1)", "foo:bar", "mailto:a@b.c"] {
            let response = client
                .post("/api/projects")
                .header(ContentType::JSON)
                .body(
                    json!({
                        "name": "Scraper",
                        "description": "Collects things",
                        "github": github,
                    })
                    .to_string(),
                )
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::BadRequest, "{}", github);

            let body: Value = response.into_json().await.unwrap();
            assert!(body["errors"]["github"].is_array(), "{}", github);
        }
        assert_eq!(test_db.count_rows("projects").await, 0);

        let response = client
            .post("/api/projects")
            .header(ContentType::JSON)
            .body(
                json!({
                    "name": "Scraper",
                    "description": "Collects things",
                    "github": "https://github.com/example/scraper",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
    }

    #[rocket::async_test]
    async fn test_job_link_must_be_a_web_link() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/jobs")
            .header(ContentType::JSON)
            .body(
                json!({
                    "company": "Acme",
                    "title": "Engineer",
                    "link": "javascript:alert(1)",
                    "start_date": "2022-01-01",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let body: Value = response.into_json().await.unwrap();
        assert!(body["errors"]["link"].is_array());
    }

    #[rocket::async_test]
    async fn test_whitespace_only_text_is_blank() {
        let test_db = create_standard_test_db().await;
        let job_id = test_db.job_id("Engineer");
        let (client, test_db) = setup_test_client(test_db).await;

        let response = client
            .post("/api/achievements")
            .header(ContentType::JSON)
            .body(json!({ "description": "   ", "job": job_id }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: Value = response.into_json().await.unwrap();
        assert!(body["errors"]["description"].is_array());
        assert_eq!(test_db.count_rows("achievements").await, 1);

        let response = client
            .post("/api/categories")
            .header(ContentType::JSON)
            .body(json!({ "name": "  Languages  " }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let category: Category = response.into_json().await.unwrap();
        assert_eq!(category.name, "Languages");
    }
}
