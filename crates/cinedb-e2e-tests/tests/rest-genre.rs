use cinedb_app::rest_api::TOTAL_COUNT_HEADER;
use cinedb_e2e_tests::{extend_url, page_url, prepare_env, spawn_server};
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;

fn total_count(response: &reqwest::Response) -> u64 {
    response.headers()[TOTAL_COUNT_HEADER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap()
}

#[tokio::test]
#[traced_test]
async fn test_genre_crud() {
    let (args, _config_guard) = prepare_env("test_genre_crud").await.unwrap();
    let base_url = args.base_url.clone();
    spawn_server(args).await.unwrap();

    let client = reqwest::Client::new();
    let api_url = base_url.join("api/generos").unwrap();

    let response = client
        .post(api_url.clone())
        .json(&json!({"nombre": "Drama"}))
        .send()
        .await
        .unwrap();
    info! {"Response: {:#?}", response};
    assert_eq!(response.status().as_u16(), 201);
    let location = response.headers()["location"].to_str().unwrap().to_string();
    let genre: serde_json::Value = response.json().await.unwrap();
    let id = genre["id"].as_i64().unwrap();
    assert_eq!(genre["nombre"], "Drama");
    assert_eq!(location, extend_url(&api_url, id).to_string());

    let response = client.get(&location).send().await.unwrap();
    assert!(response.status().is_success());
    let genre: serde_json::Value = response.json().await.unwrap();
    assert_eq!(genre, json!({"id": id, "nombre": "Drama"}));

    // alternative casing of field name is accepted
    let response = client
        .post(api_url.clone())
        .json(&json!({"Nombre": "Comedia"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let response = client
        .put(extend_url(&api_url, id))
        .json(&json!({"nombre": "Drama romántico"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client.get(extend_url(&api_url, id)).send().await.unwrap();
    let genre: serde_json::Value = response.json().await.unwrap();
    assert_eq!(genre["nombre"], "Drama romántico");

    let response = client.get(api_url.clone()).send().await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(total_count(&response), 2);
    let rows: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(rows.len(), 2);

    let response = client
        .delete(extend_url(&api_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client.get(extend_url(&api_url, id)).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");

    let response = client.get(api_url.clone()).send().await.unwrap();
    assert_eq!(total_count(&response), 1);
}

#[tokio::test]
#[traced_test]
async fn test_genre_errors() {
    let (args, _config_guard) = prepare_env("test_genre_errors").await.unwrap();
    let base_url = args.base_url.clone();
    spawn_server(args).await.unwrap();

    let client = reqwest::Client::new();
    let api_url = base_url.join("api/generos").unwrap();

    let response = client
        .post(api_url.clone())
        .json(&json!({"nombre": "Drama"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let genre: serde_json::Value = response.json().await.unwrap();
    let id = genre["id"].as_i64().unwrap();

    let response = client
        .post(api_url.clone())
        .json(&json!({"nombre": "DRAMA"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    let response = client
        .post(api_url.clone())
        .json(&json!({"nombre": "terror"}))
        .send()
        .await
        .unwrap();
    info! {"Response: {:#?}", response};
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields = body["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["field"], "nombre");

    let response = client
        .post(api_url.clone())
        .json(&json!({"nombre": format!("T{}", "e".repeat(50))}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .post(api_url.clone())
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .put(extend_url(&api_url, id + 100))
        .json(&json!({"nombre": "Terror"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .delete(extend_url(&api_url, id + 100))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // failed requests left the stored genre as it was
    let response = client.get(api_url.clone()).send().await.unwrap();
    assert_eq!(total_count(&response), 1);
    let response = client.get(extend_url(&api_url, id)).send().await.unwrap();
    let genre: serde_json::Value = response.json().await.unwrap();
    assert_eq!(genre, json!({"id": id, "nombre": "Drama"}));

    let response = client
        .get(extend_url(&api_url, "abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
#[traced_test]
async fn test_genre_paging() {
    let (args, _config_guard) = prepare_env("test_genre_paging").await.unwrap();
    let base_url = args.base_url.clone();

    let pool = cinedb_dal::new_pool(&args.database_url()).await.unwrap();
    cinedb_dal::migrate(&pool).await.unwrap();
    let mut transaction = pool.begin().await.unwrap();
    let mut count: u64 = 0;
    for c1 in 'a'..='c' {
        for c2 in 'a'..='z' {
            let name = format!("Genero {c1}{c2}");
            sqlx::query("INSERT INTO genre (name, name_key) VALUES (?, ?)")
                .bind(&name)
                .bind(name.to_lowercase())
                .execute(&mut *transaction)
                .await
                .unwrap();
            count += 1;
        }
    }
    transaction.commit().await.unwrap();
    pool.close().await;
    info!("Created {count} genres");

    spawn_server(args).await.unwrap();
    let client = reqwest::Client::new();
    let api_url = base_url.join("api/generos").unwrap();

    let response = client.get(api_url.clone()).send().await.unwrap();
    assert_eq!(total_count(&response), count);
    let rows: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0]["nombre"], "Genero aa");

    let response = client
        .get(page_url(&api_url, 2, 100))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let rows: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(rows.len(), 28);
    assert_eq!(rows[0]["nombre"], "Genero by");

    let response = client
        .get(page_url(&api_url, 3, 50))
        .send()
        .await
        .unwrap();
    let rows: Vec<serde_json::Value> = response.json().await.unwrap();
    assert!(rows.is_empty());

    let response = client
        .get(page_url(&api_url, 0, 10))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
#[traced_test]
async fn test_genre_cache_invalidation() {
    let (args, _config_guard) = prepare_env("test_genre_cache").await.unwrap();
    let base_url = args.base_url.clone();
    spawn_server(args).await.unwrap();

    let client = reqwest::Client::new();
    let api_url = base_url.join("api/generos").unwrap();

    let response = client.get(api_url.clone()).send().await.unwrap();
    assert_eq!(total_count(&response), 0);

    let response = client
        .post(api_url.clone())
        .json(&json!({"nombre": "Western"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let response = client.get(api_url.clone()).send().await.unwrap();
    assert_eq!(total_count(&response), 1);
    let rows: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(rows[0]["nombre"], "Western");
}
