use chrono::Utc;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, warn};

use crate::domain::Identity;
use crate::error::ApiError;
use crate::token::{Bearer, TokenCodec};

// =============================================================================
// 1. CALLERS
// =============================================================================

/// What a request presents to prove who sent it.
#[derive(Debug, Clone)]
pub enum Credentials {
    Bearer(Bearer),
    /// Calls between the APIs themselves, e.g. stock reservation by the order service.
    Service,
}

/// The authenticated sender of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Caller {
    User(Identity),
    Service,
}

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Caller::User(identity) => Some(identity),
            Caller::Service => None,
        }
    }
}

/// Verifies a user's bearer token against the signing key.
pub fn authenticate_bearer(codec: &TokenCodec, bearer: &Bearer) -> Result<Identity, ApiError> {
    codec
        .verify(bearer.as_str(), Utc::now())
        .and_then(|claims| claims.identity())
        .map_err(|e| {
            debug!(error = %e, "Bearer rejected");
            ApiError::Unauthenticated
        })
}

pub fn authenticate(codec: &TokenCodec, credentials: &Credentials) -> Result<Caller, ApiError> {
    match credentials {
        Credentials::Bearer(bearer) => authenticate_bearer(codec, bearer).map(Caller::User),
        Credentials::Service => Ok(Caller::Service),
    }
}

// =============================================================================
// 2. THE ABSTRACTION (Traits with Hooks, DTOs, and Actions)
// =============================================================================

/// The kind of request being authorized by [`Entity::authorize`].
#[derive(Debug)]
pub enum Operation<'a, A> {
    Create,
    Read,
    List,
    Update,
    Delete,
    Action(&'a A),
}

/// Trait that any domain entity must implement to be managed by ResourceActor
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;
    type CreatePayload: Send + Sync + Debug;
    type Patch: Send + Sync + Debug;
    type Query: Send + Sync + Debug;

    type Action: Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;

    fn id(&self) -> &Self::Id;

    /// Construct the full Entity from the ID and Payload
    fn from_create(id: Self::Id, payload: Self::CreatePayload) -> Result<Self, ApiError>;

    /// Decide whether `caller` may perform `operation` at all.
    fn authorize(caller: &Caller, operation: Operation<'_, Self::Action>) -> Result<(), ApiError>;

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), ApiError> {
        Ok(())
    }
    fn on_update(&mut self, patch: Self::Patch) -> Result<(), ApiError>;
    fn on_delete(&self) -> Result<(), ApiError> {
        Ok(())
    }

    /// Mark the entity as deleted in place. Returning `false` removes it
    /// from the store instead.
    fn retire(&mut self) -> bool {
        false
    }

    /// Items a caller cannot see behave as if they did not exist.
    fn visible_to(&self, _caller: &Caller) -> bool {
        true
    }

    fn matches(&self, query: &Self::Query) -> bool;

    // --- Action Handler ---

    /// Handle a custom domain-specific action
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, ApiError>;
}

// =============================================================================
// 3. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, ApiError>>;

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    Create {
        credentials: Credentials,
        payload: T::CreatePayload,
        respond_to: Response<T>,
    },
    Get {
        credentials: Credentials,
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    List {
        credentials: Credentials,
        query: T::Query,
        respond_to: Response<Vec<T>>,
    },
    Update {
        credentials: Credentials,
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T>,
    },
    Delete {
        credentials: Credentials,
        id: T::Id,
        respond_to: Response<()>,
    },
    Action {
        credentials: Credentials,
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}

// =============================================================================
// 4. THE GENERIC ACTOR SERVER
// =============================================================================

pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
    codec: Arc<TokenCodec>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static,
        codec: Arc<TokenCodec>,
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
            codec,
        };
        let client = ResourceClient { sender };
        (actor, client)
    }

    #[instrument(name = "resource_actor", skip(self), fields(entity = std::any::type_name::<T>()))]
    pub async fn run(mut self) {
        debug!("ResourceActor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create {
                    credentials,
                    payload,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.create(&credentials, payload));
                }
                ResourceRequest::Get {
                    credentials,
                    id,
                    respond_to,
                } => {
                    let result = self.check(&credentials, Operation::Read).map(|caller| {
                        self.store
                            .get(&id)
                            .filter(|item| item.visible_to(&caller))
                            .cloned()
                    });
                    let _ = respond_to.send(result);
                }
                ResourceRequest::List {
                    credentials,
                    query,
                    respond_to,
                } => {
                    let result = self.check(&credentials, Operation::List).map(|caller| {
                        self.store
                            .values()
                            .filter(|item| item.visible_to(&caller) && item.matches(&query))
                            .cloned()
                            .collect()
                    });
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Update {
                    credentials,
                    id,
                    patch,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.update(&credentials, id, patch));
                }
                ResourceRequest::Delete {
                    credentials,
                    id,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.delete(&credentials, id));
                }
                ResourceRequest::Action {
                    credentials,
                    id,
                    action,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.perform(&credentials, id, action));
                }
            }
        }
        debug!("ResourceActor stopped");
    }

    fn check(
        &self,
        credentials: &Credentials,
        operation: Operation<'_, T::Action>,
    ) -> Result<Caller, ApiError> {
        let caller = authenticate(&self.codec, credentials)?;
        if let Err(e) = T::authorize(&caller, operation) {
            warn!(error = %e, "Request denied");
            return Err(e);
        }
        Ok(caller)
    }

    fn create(&mut self, credentials: &Credentials, payload: T::CreatePayload) -> Result<T, ApiError> {
        self.check(credentials, Operation::Create)?;
        let mut item = T::from_create((self.next_id_fn)(), payload)?;
        item.on_create()?;
        debug!(id = %item.id(), "Created");
        self.store.insert(item.id().clone(), item.clone());
        Ok(item)
    }

    /// The stored item behind `id`, unless `caller` is not allowed to see it.
    fn visible_mut(&mut self, caller: &Caller, id: &T::Id) -> Result<&mut T, ApiError> {
        self.store
            .get_mut(id)
            .filter(|item| item.visible_to(caller))
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    fn update(&mut self, credentials: &Credentials, id: T::Id, patch: T::Patch) -> Result<T, ApiError> {
        let caller = self.check(credentials, Operation::Update)?;
        let item = self.visible_mut(&caller, &id)?;
        // Apply to a copy so a failing hook leaves the stored item untouched.
        let mut updated = item.clone();
        updated.on_update(patch)?;
        *item = updated.clone();
        Ok(updated)
    }

    fn delete(&mut self, credentials: &Credentials, id: T::Id) -> Result<(), ApiError> {
        let caller = self.check(credentials, Operation::Delete)?;
        let item = self.visible_mut(&caller, &id)?;
        item.on_delete()?;
        if !item.retire() {
            self.store.remove(&id);
        }
        Ok(())
    }

    fn perform(
        &mut self,
        credentials: &Credentials,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, ApiError> {
        let caller = self.check(credentials, Operation::Action(&action))?;
        let item = self.visible_mut(&caller, &id)?;
        let mut updated = item.clone();
        let result = updated.handle_action(action)?;
        *item = updated;
        Ok(result)
    }
}

// =============================================================================
// 5. THE GENERIC CLIENT
// =============================================================================

pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

impl<T: Entity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

async fn round_trip<R, E>(
    sent: Result<(), E>,
    response: oneshot::Receiver<Result<R, ApiError>>,
) -> Result<R, ApiError> {
    sent.map_err(|_| ApiError::ActorCommunicationError("Actor closed".to_string()))?;
    response
        .await
        .map_err(|_| ApiError::ActorCommunicationError("Actor dropped".to_string()))?
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    pub async fn create(&self, credentials: Credentials, payload: T::CreatePayload) -> Result<T, ApiError> {
        let (respond_to, response) = oneshot::channel();
        let sent = self
            .sender
            .send(ResourceRequest::Create {
                credentials,
                payload,
                respond_to,
            })
            .await;
        round_trip(sent, response).await
    }

    pub async fn get(&self, credentials: Credentials, id: T::Id) -> Result<Option<T>, ApiError> {
        let (respond_to, response) = oneshot::channel();
        let sent = self
            .sender
            .send(ResourceRequest::Get {
                credentials,
                id,
                respond_to,
            })
            .await;
        round_trip(sent, response).await
    }

    pub async fn list(&self, credentials: Credentials, query: T::Query) -> Result<Vec<T>, ApiError> {
        let (respond_to, response) = oneshot::channel();
        let sent = self
            .sender
            .send(ResourceRequest::List {
                credentials,
                query,
                respond_to,
            })
            .await;
        round_trip(sent, response).await
    }

    pub async fn update(&self, credentials: Credentials, id: T::Id, patch: T::Patch) -> Result<T, ApiError> {
        let (respond_to, response) = oneshot::channel();
        let sent = self
            .sender
            .send(ResourceRequest::Update {
                credentials,
                id,
                patch,
                respond_to,
            })
            .await;
        round_trip(sent, response).await
    }

    pub async fn delete(&self, credentials: Credentials, id: T::Id) -> Result<(), ApiError> {
        let (respond_to, response) = oneshot::channel();
        let sent = self
            .sender
            .send(ResourceRequest::Delete {
                credentials,
                id,
                respond_to,
            })
            .await;
        round_trip(sent, response).await
    }

    pub async fn perform_action(
        &self,
        credentials: Credentials,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, ApiError> {
        let (respond_to, response) = oneshot::channel();
        let sent = self
            .sender
            .send(ResourceRequest::Action {
                credentials,
                id,
                action,
                respond_to,
            })
            .await;
        round_trip(sent, response).await
    }
}

// =============================================================================
// 6. EXAMPLE USAGE (Test)
// =============================================================================
