mod common;

use std::sync::Arc;

use aula::error::AppError;
use aula::models::{Capabilities, Post, ReplyRequest};
use aula::services::{AuthService, ForumService, SubmissionDraft, SubmissionService};
use chrono::{TimeZone, Utc};
use common::{ScriptedApi, session, staged_file};

#[tokio::test]
async fn blank_text_is_refused_before_any_network_call() {
    let api = Arc::new(ScriptedApi::default());
    let service = SubmissionService::new(api.clone());
    let mut draft = SubmissionDraft::new();
    draft.set_text("   ");

    let err = service
        .submit(&session(), 42, Capabilities::TEXT, &mut draft)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(api.saved_texts.lock().unwrap().is_empty());
    assert_eq!(draft.text(), "   ");
}

#[tokio::test]
async fn text_submission_saves_once_and_clears_the_draft() {
    let api = Arc::new(ScriptedApi::default());
    let service = SubmissionService::new(api.clone());
    let mut draft = SubmissionDraft::new();
    draft.set_text("<p>Mi respuesta</p>");

    let outcome = service
        .submit(&session(), 42, Capabilities::TEXT, &mut draft)
        .await
        .unwrap();

    assert!(outcome.text_ack.is_some());
    assert!(outcome.file_ack.is_none());
    assert_eq!(
        *api.saved_texts.lock().unwrap(),
        vec![(42, "<p>Mi respuesta</p>".to_string())]
    );
    assert!(draft.is_empty());
}

#[tokio::test]
async fn both_capabilities_send_text_and_file() {
    let api = Arc::new(ScriptedApi::default());
    let service = SubmissionService::new(api.clone());
    let mut draft = SubmissionDraft::new();
    draft.set_text("ver adjunto");
    draft.set_file(Some(staged_file()));

    let outcome = service
        .submit(&session(), 7, Capabilities::BOTH, &mut draft)
        .await
        .unwrap();

    assert!(outcome.text_ack.is_some());
    assert!(outcome.file_ack.is_some());
    assert_eq!(api.saved_texts.lock().unwrap().len(), 1);
    assert_eq!(
        *api.saved_files.lock().unwrap(),
        vec![(7, "informe.pdf".to_string())]
    );
    assert!(draft.file().is_none());
}

#[tokio::test]
async fn rejected_save_keeps_the_draft_and_the_backend_message() {
    let api = Arc::new(ScriptedApi::default());
    *api.save_file_error.lock().unwrap() =
        Some(AppError::Rejected("El archivo supera el tamaño máximo".to_string()));
    let service = SubmissionService::new(api.clone());
    let mut draft = SubmissionDraft::new();
    draft.set_file(Some(staged_file()));

    let err = service
        .submit(&session(), 7, Capabilities::FILE, &mut draft)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "El archivo supera el tamaño máximo");
    assert_eq!(draft.file(), Some(&staged_file()));
}

#[tokio::test]
async fn failed_upload_after_saved_text_keeps_the_whole_draft() {
    let api = Arc::new(ScriptedApi::default());
    *api.save_file_error.lock().unwrap() = Some(AppError::TransientServer {
        status: 502,
        message: "Moodle no responde".to_string(),
    });
    let service = SubmissionService::new(api.clone());
    let mut draft = SubmissionDraft::new();
    draft.set_text("ver adjunto");
    draft.set_file(Some(staged_file()));
    let before = draft.clone();

    let err = service
        .submit(&session(), 7, Capabilities::BOTH, &mut draft)
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert_eq!(
        *api.saved_texts.lock().unwrap(),
        vec![(7, "ver adjunto".to_string())]
    );
    assert!(api.saved_files.lock().unwrap().is_empty());
    assert_eq!(draft, before);

    // retrying with the kept draft goes through
    service
        .submit(&session(), 7, Capabilities::BOTH, &mut draft)
        .await
        .unwrap();
    assert_eq!(api.saved_files.lock().unwrap().len(), 1);
    assert!(draft.is_empty());
}

#[tokio::test]
async fn finalize_submits_for_grading() {
    let api = Arc::new(ScriptedApi::default());
    let service = SubmissionService::new(api.clone());

    service.finalize(&session(), 42).await.unwrap();
    assert_eq!(*api.submitted.lock().unwrap(), vec![42]);

    assert!(matches!(
        service.finalize(&session(), 0).await,
        Err(AppError::InvalidInput(_))
    ));
}

fn post(id: i64, parent: Option<i64>, minute: u32) -> Post {
    Post {
        id,
        parent_id: parent,
        subject: "Consulta".to_string(),
        author: "Ana".to_string(),
        message: "<p>hola</p>".to_string(),
        created: Some(Utc.with_ymd_and_hms(2025, 4, 2, 9, minute, 0).unwrap()),
    }
}

#[tokio::test]
async fn forum_reply_targets_the_latest_post() {
    let api = Arc::new(ScriptedApi {
        posts: vec![post(10, None, 0), post(12, Some(10), 30), post(11, Some(10), 15)],
        ..Default::default()
    });
    let service = ForumService::new(api.clone());

    service
        .reply(&session(), 3, "Consulta", "Gracias profe")
        .await
        .unwrap();

    assert_eq!(
        *api.replies.lock().unwrap(),
        vec![ReplyRequest {
            postid: 12,
            subject: "Re: Consulta".to_string(),
            message: "<p>Gracias profe</p>".to_string(),
        }]
    );

    let thread = service.thread(&session(), 3).await.unwrap().unwrap();
    assert_eq!(thread.root.post.id, 10);
    assert_eq!(thread.root.count(), 3);
}

#[tokio::test]
async fn empty_forum_reply_is_refused() {
    let api = Arc::new(ScriptedApi {
        posts: vec![post(10, None, 0)],
        ..Default::default()
    });
    let err = ForumService::new(api.clone())
        .reply(&session(), 3, "Consulta", "  ")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(api.replies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn session_survives_restore_until_logout() {
    let db = aula::db::connect("sqlite::memory:").await.unwrap();
    let auth = AuthService::new(db, Arc::new(ScriptedApi::default()));

    assert!(auth.restore().await.unwrap_err().is_auth());

    let session = auth.login("estudiante1", "secreto").await.unwrap();
    assert_eq!(auth.restore().await.unwrap(), session);

    auth.logout().await.unwrap();
    assert!(auth.restore().await.unwrap_err().is_auth());
}

#[tokio::test]
async fn blank_credentials_never_reach_the_proxy() {
    let db = aula::db::connect("sqlite::memory:").await.unwrap();
    let api = Arc::new(ScriptedApi::default());
    *api.login_result.lock().unwrap() = Some(Err(AppError::Rejected("should not be called".to_string())));
    let auth = AuthService::new(db, api.clone());

    assert!(matches!(auth.login("  ", "x").await, Err(AppError::InvalidInput(_))));
    assert!(matches!(auth.login("ana", "").await, Err(AppError::InvalidInput(_))));
    // the scripted rejection is still queued
    assert!(api.login_result.lock().unwrap().is_some());
}

#[tokio::test]
async fn rejected_login_persists_nothing() {
    let db = aula::db::connect("sqlite::memory:").await.unwrap();
    let api = Arc::new(ScriptedApi::default());
    *api.login_result.lock().unwrap() = Some(Err(AppError::Rejected("Credenciales incorrectas".to_string())));
    let auth = AuthService::new(db, api);

    let err = auth.login("ana", "mala").await.unwrap_err();
    assert_eq!(err.to_string(), "Credenciales incorrectas");
    assert!(auth.restore().await.is_err());
}
