use chrono::Utc;
use porter_storage::{
    AccountStore, CreateAccountParams, MemberId, StoreError, SubscriptionStatus,
};
use porter_store_sqlite::SqliteStore;

fn account_params(email: &str, code: Option<&str>, status: SubscriptionStatus) -> CreateAccountParams {
    CreateAccountParams {
        email: email.to_string(),
        invite_code: code.map(str::to_string),
        subscription_status: status,
    }
}

async fn pause() {
    // updated_at has millisecond resolution
    tokio::time::sleep(std::time::Duration::from_millis(3)).await;
}

#[tokio::test]
async fn account_lifecycle_link_and_unlink() {
    let s = SqliteStore::open_in_memory().await.unwrap();

    let account = s
        .create_account(&account_params("a@example.com", Some("abc123"), SubscriptionStatus::Active))
        .await
        .unwrap();
    assert!(account.external_id.is_none());
    assert!(account.linked_at.is_none());

    // Pending until linked
    let pending = s.query_pending_identities(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].account_id, account.id);
    assert_eq!(pending[0].invite_code, "abc123");
    assert!(pending[0].subscription_active);

    let member = MemberId(80351110224678912);
    let at = Utc::now();
    s.link_identity(&account.id, &member, at).await.unwrap();
    // Idempotent
    s.link_identity(&account.id, &member, at).await.unwrap();

    let linked = s.get_account(&account.id).await.unwrap();
    assert_eq!(linked.external_id, Some(member));
    assert_eq!(
        linked.linked_at.map(|t| t.timestamp_millis()),
        Some(at.timestamp_millis())
    );
    assert!(s.query_pending_identities(10).await.unwrap().is_empty());

    // Lookup by invite code
    let found = s.lookup_account_by_invite("abc123").await.unwrap().unwrap();
    assert_eq!(found.id, account.id);
    assert!(s.lookup_account_by_invite("nope").await.unwrap().is_none());

    // Leaving clears the identity so the account can be matched again
    assert!(s.unlink_identity(&member).await.unwrap());
    assert!(!s.unlink_identity(&member).await.unwrap());
    let unlinked = s.get_account(&account.id).await.unwrap();
    assert!(unlinked.external_id.is_none());
    assert_eq!(s.query_pending_identities(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn pending_identities_are_filtered_and_ordered() {
    let s = SqliteStore::open_in_memory().await.unwrap();

    let oldest = s
        .create_account(&account_params("old@example.com", Some("old"), SubscriptionStatus::Active))
        .await
        .unwrap();
    pause().await;
    s.create_account(&account_params("none@example.com", None, SubscriptionStatus::Active))
        .await
        .unwrap();
    pause().await;
    s.create_account(&account_params(
        "lapsed@example.com",
        Some("lapsed"),
        SubscriptionStatus::PastDue,
    ))
    .await
    .unwrap();
    pause().await;
    let trial = s
        .create_account(&account_params("trial@example.com", Some("trial"), SubscriptionStatus::Trialing))
        .await
        .unwrap();
    pause().await;
    let newest = s
        .create_account(&account_params("new@example.com", Some("new"), SubscriptionStatus::Active))
        .await
        .unwrap();

    let pending = s.query_pending_identities(10).await.unwrap();
    let ids: Vec<_> = pending.iter().map(|p| p.account_id.clone()).collect();
    assert_eq!(ids, vec![newest.id.clone(), trial.id.clone(), oldest.id.clone()]);

    // Limit bounds the page
    let page = s.query_pending_identities(2).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].account_id, newest.id);

    // Touching an account moves it to the front
    pause().await;
    s.set_subscription_status(&oldest.id, SubscriptionStatus::Active)
        .await
        .unwrap();
    let pending = s.query_pending_identities(1).await.unwrap();
    assert_eq!(pending[0].account_id, oldest.id);
}

#[tokio::test]
async fn linking_moves_member_between_accounts() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let first = s
        .create_account(&account_params("one@example.com", Some("one"), SubscriptionStatus::Active))
        .await
        .unwrap();
    let second = s
        .create_account(&account_params("two@example.com", Some("two"), SubscriptionStatus::Active))
        .await
        .unwrap();

    let member = MemberId(99);
    s.link_identity(&first.id, &member, Utc::now()).await.unwrap();
    s.link_identity(&second.id, &member, Utc::now()).await.unwrap();

    assert!(s.get_account(&first.id).await.unwrap().external_id.is_none());
    assert_eq!(s.get_account(&second.id).await.unwrap().external_id, Some(member));
}

#[tokio::test]
async fn duplicate_invite_code_and_missing_account() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    s.create_account(&account_params("x@example.com", Some("dup"), SubscriptionStatus::Active))
        .await
        .unwrap();

    let err = s
        .create_account(&account_params("y@example.com", Some("dup"), SubscriptionStatus::Active))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists));

    let ghost = porter_storage::AccountId(uuid_v4());
    assert!(matches!(
        s.link_identity(&ghost, &MemberId(1), Utc::now()).await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        s.set_subscription_status(&ghost, SubscriptionStatus::Active).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn file_backed_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("porter.db").display());

    let id = {
        let s = SqliteStore::open(&url).await.unwrap();
        s.create_account(&account_params("p@example.com", Some("persist"), SubscriptionStatus::Active))
            .await
            .unwrap()
            .id
    };

    let s = SqliteStore::open(&url).await.unwrap();
    let account = s.get_account(&id).await.unwrap();
    assert_eq!(account.invite_code.as_deref(), Some("persist"));
}

fn uuid_v4() -> uuid::Uuid {
    uuid::Uuid::new_v4()
}
