mod common;

use axum::http::{Method, StatusCode};
use common::{ArticleFixture, as_user, get, ids, login, spawn};
use serde_json::json;

// --- Articles: ownership ---

#[tokio::test]
async fn test_editor_gets_forbidden_not_not_found_for_foreign_article() {
    let app = spawn().await;
    let seed = &app.seed;
    let foreign = ArticleFixture::new(seed, "Ajena", &seed.other_editor)
        .insert(app.repo())
        .await;
    let uri = format!("/admin/articles/{}", foreign.id);

    let (status, _, _) = app
        .send(as_user(
            Method::PUT,
            &uri,
            &seed.editor,
            Some(json!({ "title": "Secuestrada" })),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app
        .send(as_user(Method::DELETE, &uri, &seed.editor, None))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app
        .send(as_user(Method::GET, &uri, &seed.editor, None))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Untouched.
    let stored = app.repo().get_article(foreign.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Ajena");

    let (status, _, _) = app
        .send(as_user(
            Method::DELETE,
            "/admin/articles/999999",
            &seed.editor,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_editor_manages_own_article() {
    let app = spawn().await;
    let seed = &app.seed;
    let own = ArticleFixture::new(seed, "Propia", &seed.editor)
        .insert(app.repo())
        .await;
    let uri = format!("/admin/articles/{}", own.id);

    let (status, _, body) = app
        .send(as_user(
            Method::PUT,
            &uri,
            &seed.editor,
            Some(json!({ "title": "Propia, corregida", "active": false })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Propia, corregida");
    assert_eq!(body["active"], false);
    assert_eq!(body["summary"], "Summary of Propia");

    let (status, _, _) = app
        .send(as_user(Method::DELETE, &uri, &seed.editor, None))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.repo().get_article(own.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_only_admin_reassigns_authorship() {
    let app = spawn().await;
    let seed = &app.seed;
    let own = ArticleFixture::new(seed, "Propia", &seed.editor)
        .insert(app.repo())
        .await;
    let uri = format!("/admin/articles/{}", own.id);

    let (status, _, _) = app
        .send(as_user(
            Method::PUT,
            &uri,
            &seed.editor,
            Some(json!({ "authorId": seed.other_editor.id })),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = app
        .send(as_user(
            Method::PUT,
            &uri,
            &seed.admin,
            Some(json!({ "authorId": seed.other_editor.id })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authorId"], seed.other_editor.id);

    let (status, _, _) = app
        .send(as_user(
            Method::PUT,
            &uri,
            &seed.admin,
            Some(json!({ "authorId": 777777 })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_editor_lists_only_own_articles() {
    let app = spawn().await;
    let seed = &app.seed;
    let mine = ArticleFixture::new(seed, "Mia", &seed.editor)
        .inactive()
        .insert(app.repo())
        .await;
    let theirs = ArticleFixture::new(seed, "Suya", &seed.other_editor)
        .minutes_ago(5)
        .insert(app.repo())
        .await;

    let (status, _, body) = app
        .send(as_user(Method::GET, "/admin/articles", &seed.editor, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    // Inactive articles are visible on the admin surface.
    assert_eq!(ids(&body), vec![mine.id as i64]);

    let (_, _, body) = app
        .send(as_user(Method::GET, "/admin/articles", &seed.admin, None))
        .await;
    assert_eq!(ids(&body), vec![mine.id as i64, theirs.id as i64]);

    let (_, _, body) = app
        .send(as_user(
            Method::GET,
            "/admin/articles?search=suya",
            &seed.admin,
            None,
        ))
        .await;
    assert_eq!(ids(&body), vec![theirs.id as i64]);
}

#[tokio::test]
async fn test_create_article_sets_author_and_validates_links() {
    let app = spawn().await;
    let seed = &app.seed;

    let (status, _, body) = app
        .send(as_user(
            Method::POST,
            "/admin/articles",
            &seed.editor,
            Some(json!({
                "title": "Nueva",
                "body": "Contenido",
                "summary": "Resumen",
                "countryId": seed.honduras.id,
                "categoryId": seed.sports.id,
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["authorId"], seed.editor.id);
    assert_eq!(body["active"], true);

    let (status, _, _) = app
        .send(as_user(
            Method::POST,
            "/admin/articles",
            &seed.editor,
            Some(json!({
                "title": "Nueva",
                "body": "Contenido",
                "summary": "Resumen",
                "countryId": seed.honduras.id,
                "categoryId": seed.hidden_category.id,
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = app
        .send(as_user(
            Method::POST,
            "/admin/articles",
            &seed.editor,
            Some(json!({
                "title": "",
                "body": "Contenido",
                "summary": "Resumen",
                "countryId": seed.honduras.id,
                "categoryId": seed.sports.id,
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// --- Dashboard ---

#[tokio::test]
async fn test_dashboard_is_scoped_for_editors() {
    let app = spawn().await;
    let seed = &app.seed;
    ArticleFixture::new(seed, "Mia", &seed.editor)
        .insert(app.repo())
        .await;
    for i in 0..6 {
        ArticleFixture::new(seed, &format!("Suya {i}"), &seed.other_editor)
            .insert(app.repo())
            .await;
    }

    let (status, _, body) = app
        .send(as_user(Method::GET, "/admin/dashboard", &seed.editor, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalArticles"], 1);
    assert_eq!(body["activeUsers"], 0);
    assert_eq!(body["activeCategories"], 2);
    assert_eq!(body["activeCountries"], 2);

    let (_, _, body) = app
        .send(as_user(Method::GET, "/admin/dashboard", &seed.admin, None))
        .await;
    assert_eq!(body["totalArticles"], 7);
    assert_eq!(body["activeUsers"], 3);
    assert_eq!(body["latestArticles"].as_array().unwrap().len(), 5);
}

// --- Reference data ---

#[tokio::test]
async fn test_editor_cannot_manage_reference_data() {
    let app = spawn().await;
    let seed = &app.seed;
    for uri in ["/admin/categories", "/admin/countries", "/admin/users"] {
        let (status, _, _) = app
            .send(as_user(Method::GET, uri, &seed.editor, None))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }

    let (status, _, _) = app
        .send(as_user(
            Method::POST,
            "/admin/categories",
            &seed.editor,
            Some(json!({ "name": "Farandula" })),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_referenced_category_cannot_be_deleted() {
    let app = spawn().await;
    let seed = &app.seed;
    ArticleFixture::new(seed, "Ancla", &seed.editor)
        .in_category(&seed.politics)
        .insert(app.repo())
        .await;
    let uri = format!("/admin/categories/{}", seed.politics.id);

    let (status, _, body) = app
        .send(as_user(Method::DELETE, &uri, &seed.admin, None))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("1 article"));

    let (status, _, body) = app
        .send(as_user(Method::GET, &uri, &seed.admin, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["articleCount"], 1);
    assert_eq!(body["category"]["name"], "Politica");

    // An unreferenced category goes away.
    let (status, _, _) = app
        .send(as_user(
            Method::DELETE,
            &format!("/admin/categories/{}", seed.hidden_category.id),
            &seed.admin,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_referenced_country_cannot_be_deleted() {
    let app = spawn().await;
    let seed = &app.seed;
    ArticleFixture::new(seed, "Ancla", &seed.editor)
        .insert(app.repo())
        .await;

    let (status, _, _) = app
        .send(as_user(
            Method::DELETE,
            &format!("/admin/countries/{}", seed.honduras.id),
            &seed.admin,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(
        app.repo()
            .get_country(seed.honduras.id, false)
            .await
            .unwrap()
            .is_some()
    );

    let (status, _, _) = app
        .send(as_user(
            Method::DELETE,
            "/admin/countries/999999",
            &seed.admin,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_and_country_crud() {
    let app = spawn().await;
    let admin = &app.seed.admin;

    let (status, _, created) = app
        .send(as_user(
            Method::POST,
            "/admin/categories",
            admin,
            Some(json!({ "name": "Tecnologia", "description": "Gadgets" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["active"], true);
    let id = created["id"].as_i64().unwrap();

    let (status, _, updated) = app
        .send(as_user(
            Method::PUT,
            &format!("/admin/categories/{id}"),
            admin,
            Some(json!({ "active": false })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Tecnologia");
    assert_eq!(updated["active"], false);

    // Now hidden from the public API, still visible to admins.
    let (status, _, _) = app.send(get(&format!("/api/Categorias/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, _, all) = app
        .send(as_user(Method::GET, "/admin/categories", admin, None))
        .await;
    assert_eq!(all.as_array().unwrap().len(), 4);

    let (status, _, _) = app
        .send(as_user(
            Method::POST,
            "/admin/countries",
            admin,
            Some(json!({ "name": "El Salvador", "code": "SLVX" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = app
        .send(as_user(
            Method::PUT,
            "/admin/countries/999999",
            admin,
            Some(json!({ "name": "Nada" })),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- Users ---

#[tokio::test]
async fn test_duplicate_email_is_rejected_without_insert() {
    let app = spawn().await;
    let seed = &app.seed;
    let before = app.repo().list_users().await.unwrap().len();

    let (status, _, body) = app
        .send(as_user(
            Method::POST,
            "/admin/users",
            &seed.admin,
            Some(json!({
                "username": "brand-new",
                "email": "editor@noticias.test",
                "fullName": "Brand New",
                "role": "Editor",
                "password": "longenough",
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "username or email already exists");
    assert_eq!(app.repo().list_users().await.unwrap().len(), before);
}

#[tokio::test]
async fn test_user_password_rules() {
    let app = spawn().await;
    let seed = &app.seed;

    let (status, _, _) = app
        .send(as_user(
            Method::POST,
            "/admin/users",
            &seed.admin,
            Some(json!({
                "username": "shorty",
                "email": "shorty@noticias.test",
                "fullName": "Shorty",
                "role": "Editor",
                "password": "12345",
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Six spaces pass the length rule but are still a blank password.
    let (status, _, body) = app
        .send(as_user(
            Method::POST,
            "/admin/users",
            &seed.admin,
            Some(json!({
                "username": "spaces",
                "email": "spaces@noticias.test",
                "fullName": "Spaces",
                "role": "Editor",
                "password": "      ",
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "password must not be blank");
    let (_, _, users) = app.send(as_user(Method::GET, "/admin/users", &seed.admin, None)).await;
    assert!(
        users
            .as_array()
            .unwrap()
            .iter()
            .all(|u| u["username"] != "spaces")
    );

    let (status, _, created) = app
        .send(as_user(
            Method::POST,
            "/admin/users",
            &seed.admin,
            Some(json!({
                "username": "newbie",
                "email": "newbie@noticias.test",
                "fullName": "New Bie",
                "role": "Admin",
                "password": "123456",
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created.get("passwordHash").is_none());
    let uri = format!("/admin/users/{}", created["id"]);

    // Blank keeps the current password.
    let (status, _, _) = app
        .send(as_user(
            Method::PUT,
            &uri,
            &seed.admin,
            Some(json!({ "fullName": "New Bie II", "newPassword": "   " })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = login(&app, "newbie", "123456").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app
        .send(as_user(
            Method::PUT,
            &uri,
            &seed.admin,
            Some(json!({ "newPassword": "abc" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = app
        .send(as_user(
            Method::PUT,
            &uri,
            &seed.admin,
            Some(json!({ "newPassword": "rotated-secret" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = login(&app, "newbie", "123456").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = login(&app, "newbie", "rotated-secret").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_username_clash_on_update_is_rejected() {
    let app = spawn().await;
    let seed = &app.seed;
    let (status, _, _) = app
        .send(as_user(
            Method::PUT,
            &format!("/admin/users/{}", seed.editor.id),
            &seed.admin,
            Some(json!({ "username": "reporter" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Keeping one's own username is not a clash.
    let (status, _, _) = app
        .send(as_user(
            Method::PUT,
            &format!("/admin/users/{}", seed.editor.id),
            &seed.admin,
            Some(json!({ "username": "editor", "email": "editor@noticias.test" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_author_cannot_be_deleted() {
    let app = spawn().await;
    let seed = &app.seed;
    ArticleFixture::new(seed, "Firmada", &seed.other_editor)
        .insert(app.repo())
        .await;

    let uri = format!("/admin/users/{}", seed.other_editor.id);
    let (status, _, _) = app
        .send(as_user(Method::DELETE, &uri, &seed.admin, None))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, body) = app
        .send(as_user(Method::GET, &uri, &seed.admin, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["articleCount"], 1);

    let (status, _, _) = app
        .send(as_user(
            Method::DELETE,
            &format!("/admin/users/{}", seed.retired.id),
            &seed.admin,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
