//! Operation-level behaviour against the in-process store

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use api::{
    error::ApiError,
    identity::Identity,
    jwt::{JwtConfig, JwtService},
    models::{
        AddPaletteRequest, AddUserRequest, NewPalette, NewUser, Palette, PaletteColors, Tag, User,
    },
    repositories::{
        MemoryStore, PaletteRepository, StoreResult, TagRepository, UserRepository,
    },
    service::PaletteService,
};
use async_trait::async_trait;
use uuid::Uuid;

fn jwt() -> JwtService {
    JwtService::new(&JwtConfig {
        secret: "operations-secret".to_string(),
        expiry_seconds: 3600,
    })
    .unwrap()
}

fn service_over(store: MemoryStore) -> PaletteService {
    let store = Arc::new(store);
    PaletteService::new(store.clone(), store.clone(), store, jwt())
}

fn palette_request(title: &str) -> AddPaletteRequest {
    AddPaletteRequest {
        title: title.to_string(),
        description: format!("{title} tones"),
        colors: PaletteColors {
            primary: "#264653".to_string(),
            secondary: "#2a9d8f".to_string(),
            accent1: "#e9c46a".to_string(),
            accent2: "#f4a261".to_string(),
            accent3: "#e76f51".to_string(),
        },
    }
}

async fn register(service: &PaletteService, username: &str) -> Identity {
    let auth = service
        .add_user(AddUserRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "password1".to_string(),
        })
        .await
        .unwrap();

    Identity {
        id: auth.user.id,
        username: auth.user.username,
        email: auth.user.email,
    }
}

fn count(ids: &[Uuid], id: Uuid) -> usize {
    ids.iter().filter(|candidate| **candidate == id).count()
}

#[tokio::test]
async fn add_palette_records_ownership_once() {
    let service = service_over(MemoryStore::new());
    let alice = register(&service, "alice").await;

    let before = service.user("alice").await.unwrap().unwrap();
    assert!(before.my_palettes.is_empty());

    let palette = service
        .add_palette(Some(&alice), palette_request("Dune"))
        .await
        .unwrap();
    assert_eq!(palette.username, "alice");

    let after = service.user("alice").await.unwrap().unwrap();
    let ids: Vec<Uuid> = after.my_palettes.iter().map(|p| p.id).collect();
    assert_eq!(count(&ids, palette.id), 1);
}

#[tokio::test]
async fn repeated_upvotes_count_once() {
    let service = service_over(MemoryStore::new());
    let alice = register(&service, "alice").await;
    let bob = register(&service, "bob").await;
    let palette = service
        .add_palette(Some(&alice), palette_request("Moss"))
        .await
        .unwrap();

    service.add_upvote(Some(&bob), palette.id).await.unwrap();
    let upvoted = service.add_upvote(Some(&bob), palette.id).await.unwrap();

    assert_eq!(count(&upvoted.upvotes, bob.id), 1);
    assert_eq!(upvoted.upvote_count, 1);
}

#[tokio::test]
async fn favorite_is_visible_on_both_sides() {
    let service = service_over(MemoryStore::new());
    let alice = register(&service, "alice").await;
    let bob = register(&service, "bob").await;
    let palette = service
        .add_palette(Some(&alice), palette_request("Tide"))
        .await
        .unwrap();

    let saved = service.add_fav_palette(Some(&bob), palette.id).await.unwrap();
    service.add_fav_palette(Some(&bob), palette.id).await.unwrap();

    assert_eq!(count(&saved.saves, bob.id), 1);
    assert_eq!(saved.save_count, 1);

    let me = service.me(Some(&bob)).await.unwrap();
    let favorites: Vec<Uuid> = me.favorites.iter().map(|p| p.id).collect();
    assert_eq!(favorites, vec![palette.id]);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let service = service_over(MemoryStore::new());
    register(&service, "alice").await;

    let wrong_password = service.login("alice", "not-the-password").await.unwrap_err();
    let unknown_user = service.login("mallory", "password1").await.unwrap_err();

    assert!(matches!(wrong_password, ApiError::InvalidCredentials));
    assert!(matches!(unknown_user, ApiError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    assert_eq!(wrong_password.status(), unknown_user.status());
}

#[tokio::test]
async fn login_with_correct_password_issues_token() {
    let service = service_over(MemoryStore::new());
    let alice = register(&service, "alice").await;

    let auth = service.login("alice", "password1").await.unwrap();
    let claims = jwt().validate_token(&auth.token).unwrap();
    assert_eq!(claims.sub, alice.id);
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let service = service_over(MemoryStore::new());
    register(&service, "alice").await;

    let err = service
        .add_user(AddUserRequest {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            password: "password1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn invalid_registration_is_rejected() {
    let service = service_over(MemoryStore::new());

    let err = service
        .add_user(AddUserRequest {
            username: "a b".to_string(),
            email: "alice@example.com".to_string(),
            password: "password1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
}

#[tokio::test]
async fn remove_palette_releases_only_that_palette() {
    let service = service_over(MemoryStore::new());
    let alice = register(&service, "alice").await;
    let first = service
        .add_palette(Some(&alice), palette_request("First"))
        .await
        .unwrap();
    let second = service
        .add_palette(Some(&alice), palette_request("Second"))
        .await
        .unwrap();

    let owner = service.remove_palette(Some(&alice), first.id).await.unwrap();
    assert_eq!(owner.my_palettes, vec![second.id]);
}

#[tokio::test]
async fn removed_palette_is_orphaned_not_deleted() {
    let service = service_over(MemoryStore::new());
    let alice = register(&service, "alice").await;
    let bob = register(&service, "bob").await;
    let palette = service
        .add_palette(Some(&alice), palette_request("Orphan"))
        .await
        .unwrap();
    let tag = service.create_tag("muted").await.unwrap();
    service.add_upvote(Some(&bob), palette.id).await.unwrap();
    service.add_fav_palette(Some(&bob), palette.id).await.unwrap();
    service
        .link_tag_to_palette(Some(&bob), palette.id, tag.id)
        .await
        .unwrap();

    service.remove_palette(Some(&alice), palette.id).await.unwrap();

    // No cascade: the record and every back-reference survive.
    let still_there = service.palette(palette.id).await.unwrap().unwrap();
    assert_eq!(still_there.upvotes, vec![bob.id]);
    assert_eq!(still_there.saves, vec![bob.id]);
    assert_eq!(still_there.tags.len(), 1);

    let bob_profile = service.me(Some(&bob)).await.unwrap();
    assert_eq!(bob_profile.favorites.len(), 1);

    let tag = service.tag("muted").await.unwrap().unwrap();
    assert_eq!(tag.tagged_palettes.len(), 1);

    let listed = service.palettes(Some("alice")).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn palettes_by_owner_are_newest_first() {
    let service = service_over(MemoryStore::new());
    let alice = register(&service, "alice").await;
    let bob = register(&service, "bob").await;

    let p1 = service
        .add_palette(Some(&alice), palette_request("P1"))
        .await
        .unwrap();
    service
        .add_palette(Some(&bob), palette_request("Bob's"))
        .await
        .unwrap();
    let p2 = service
        .add_palette(Some(&alice), palette_request("P2"))
        .await
        .unwrap();

    let ids: Vec<Uuid> = service
        .palettes(Some("alice"))
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![p2.id, p1.id]);

    assert_eq!(service.palettes(None).await.unwrap().len(), 3);

    let all: Vec<Uuid> = service
        .search_all_palettes()
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(all.first(), Some(&p1.id));
    assert_eq!(all.last(), Some(&p2.id));
}

#[tokio::test]
async fn linking_a_tag_twice_is_idempotent() {
    let service = service_over(MemoryStore::new());
    let alice = register(&service, "alice").await;
    let palette = service
        .add_palette(Some(&alice), palette_request("Ember"))
        .await
        .unwrap();
    let tag = service.create_tag("warm").await.unwrap();

    service
        .link_tag_to_palette(Some(&alice), palette.id, tag.id)
        .await
        .unwrap();
    let linked = service
        .link_tag_to_palette(Some(&alice), palette.id, tag.id)
        .await
        .unwrap();

    assert_eq!(count(&linked.tagged_palettes, palette.id), 1);

    let palette = service.palette(palette.id).await.unwrap().unwrap();
    assert_eq!(palette.tags.len(), 1);
    assert_eq!(palette.tags[0].name, "warm");
}

#[tokio::test]
async fn relation_targets_must_exist() {
    let service = service_over(MemoryStore::new());
    let alice = register(&service, "alice").await;
    let tag = service.create_tag("cool").await.unwrap();
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.add_upvote(Some(&alice), missing).await,
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        service.add_fav_palette(Some(&alice), missing).await,
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        service.link_tag_to_palette(Some(&alice), missing, tag.id).await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn duplicate_tag_names_coexist() {
    let service = service_over(MemoryStore::new());

    let first = service.create_tag("pastel").await.unwrap();
    let second = service.create_tag("pastel").await.unwrap();
    assert_ne!(first.id, second.id);

    assert_eq!(service.tags().await.unwrap().len(), 2);
    let found = service.tag("pastel").await.unwrap().unwrap();
    assert_eq!(found.id, first.id);
}

#[tokio::test]
async fn lookups_of_unknown_records_are_absent() {
    let service = service_over(MemoryStore::new());

    assert!(service.user("nobody").await.unwrap().is_none());
    assert!(service.palette(Uuid::new_v4()).await.unwrap().is_none());
    assert!(service.tag("nothing").await.unwrap().is_none());
}

/// Store wrapper that counts every write reaching it
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
}

impl CountingStore {
    fn write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserRepository for CountingStore {
    async fn create(&self, new_user: &NewUser) -> StoreResult<User> {
        self.write();
        UserRepository::create(&self.inner, new_user).await
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.inner.find_by_username(username).await
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        UserRepository::find_by_id(&self.inner, id).await
    }

    async fn remove_owned_palette(
        &self,
        user_id: Uuid,
        palette_id: Uuid,
    ) -> StoreResult<Option<User>> {
        self.write();
        self.inner.remove_owned_palette(user_id, palette_id).await
    }
}

#[async_trait]
impl PaletteRepository for CountingStore {
    async fn create(
        &self,
        owner_id: Uuid,
        owner_username: &str,
        new_palette: &NewPalette,
    ) -> StoreResult<Palette> {
        self.write();
        PaletteRepository::create(&self.inner, owner_id, owner_username, new_palette).await
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Palette>> {
        PaletteRepository::find_by_id(&self.inner, id).await
    }

    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Palette>> {
        PaletteRepository::find_many(&self.inner, ids).await
    }

    async fn list(&self, username: Option<&str>) -> StoreResult<Vec<Palette>> {
        PaletteRepository::list(&self.inner, username).await
    }

    async fn list_all(&self) -> StoreResult<Vec<Palette>> {
        self.inner.list_all().await
    }

    async fn add_upvote(&self, palette_id: Uuid, user_id: Uuid) -> StoreResult<Option<Palette>> {
        self.write();
        self.inner.add_upvote(palette_id, user_id).await
    }

    async fn add_save(&self, palette_id: Uuid, user_id: Uuid) -> StoreResult<Option<Palette>> {
        self.write();
        self.inner.add_save(palette_id, user_id).await
    }
}

#[async_trait]
impl TagRepository for CountingStore {
    async fn create(&self, name: &str) -> StoreResult<Tag> {
        self.write();
        TagRepository::create(&self.inner, name).await
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        self.inner.find_by_name(name).await
    }

    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Tag>> {
        TagRepository::find_many(&self.inner, ids).await
    }

    async fn list(&self) -> StoreResult<Vec<Tag>> {
        TagRepository::list(&self.inner).await
    }

    async fn link_palette(&self, tag_id: Uuid, palette_id: Uuid) -> StoreResult<Option<Tag>> {
        self.write();
        self.inner.link_palette(tag_id, palette_id).await
    }
}

#[tokio::test]
async fn anonymous_mutations_write_nothing() {
    let store = Arc::new(CountingStore::default());
    let service = PaletteService::new(store.clone(), store.clone(), store.clone(), jwt());
    let any_id = Uuid::new_v4();

    let results = [
        service.add_palette(None, palette_request("Nope")).await.err(),
        service.remove_palette(None, any_id).await.err(),
        service.add_upvote(None, any_id).await.err(),
        service.add_fav_palette(None, any_id).await.err(),
        service.link_tag_to_palette(None, any_id, any_id).await.err(),
    ];
    for result in results {
        assert!(matches!(result, Some(ApiError::Unauthenticated)));
    }
    assert!(matches!(service.me(None).await, Err(ApiError::Unauthenticated)));

    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn token_for_unknown_user_is_unauthenticated_and_writes_nothing() {
    let store = Arc::new(CountingStore::default());
    let service = PaletteService::new(store.clone(), store.clone(), store.clone(), jwt());

    let alice = register(&service, "alice").await;
    let palette = service
        .add_palette(Some(&alice), palette_request("Harbor"))
        .await
        .unwrap();
    let tag = service.create_tag("sea").await.unwrap();
    let writes_before = store.writes.load(Ordering::SeqCst);

    // Signed for a user the store has never seen, e.g. issued before a restart.
    let stale = Identity {
        id: Uuid::new_v4(),
        username: "stale".to_string(),
        email: "stale@example.com".to_string(),
    };

    let results = [
        service.add_palette(Some(&stale), palette_request("Lost")).await.err(),
        service.remove_palette(Some(&stale), palette.id).await.err(),
        service.add_upvote(Some(&stale), palette.id).await.err(),
        service.add_fav_palette(Some(&stale), palette.id).await.err(),
        service
            .link_tag_to_palette(Some(&stale), palette.id, tag.id)
            .await
            .err(),
    ];
    for result in results {
        assert!(matches!(result, Some(ApiError::Unauthenticated)));
    }
    assert!(matches!(
        service.me(Some(&stale)).await,
        Err(ApiError::Unauthenticated)
    ));
    assert_eq!(store.writes.load(Ordering::SeqCst), writes_before);

    assert!(service.palettes(Some("stale")).await.unwrap().is_empty());
    let palette = service.palette(palette.id).await.unwrap().unwrap();
    assert_eq!(palette.upvote_count, 0);
    assert_eq!(palette.save_count, 0);
    assert!(palette.tags.is_empty());
}
