/// Generates a client method that sends one request variant to a service
/// actor and waits for its reply.
///
/// Parameter names must match the variant's field names.
macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident) => {
        impl $client {
            #[tracing::instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, $crate::error::ApiError> {
                tracing::debug!("Sending request");
                let (respond_to, response) = tokio::sync::oneshot::channel();
                self.sender
                    .send($request::$variant {
                        $($param,)*
                        respond_to,
                    })
                    .await
                    .map_err(|_| $crate::error::ApiError::ActorCommunicationError("Actor closed".to_string()))?;

                response
                    .await
                    .map_err(|_| $crate::error::ApiError::ActorCommunicationError("Actor dropped".to_string()))?
            }
        }
    };
}

/// Generates `get_<name>` and `delete_<name>` for a client wrapping a
/// `ResourceClient`, authenticating each call with the caller's bearer.
macro_rules! impl_client_methods {
    ($client_name:ident, $entity:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self, bearer))]
                pub async fn [<get_ $entity_name_snake>](
                    &self,
                    bearer: &$crate::token::Bearer,
                    id: String,
                ) -> Result<Option<$entity>, $crate::error::ApiError> {
                    tracing::debug!("Sending request");
                    self.inner
                        .get($crate::actor_framework::Credentials::Bearer(bearer.clone()), id)
                        .await
                }

                #[tracing::instrument(skip(self, bearer))]
                pub async fn [<delete_ $entity_name_snake>](
                    &self,
                    bearer: &$crate::token::Bearer,
                    id: String,
                ) -> Result<(), $crate::error::ApiError> {
                    tracing::debug!("Sending request");
                    self.inner
                        .delete($crate::actor_framework::Credentials::Bearer(bearer.clone()), id)
                        .await
                }
            }
        }
    };
}

macro_rules! impl_client_new {
    ($client_name:ident, $entity:ty) => {
        impl $client_name {
            pub fn new(inner: $crate::actor_framework::ResourceClient<$entity>) -> Self {
                Self { inner }
            }
        }
    };
}

macro_rules! impl_basic_client {
    ($client_name:ident, $entity:ty, $entity_name_snake:ident) => {
        impl_client_new!($client_name, $entity);
        impl_client_methods!($client_name, $entity, $entity_name_snake);
    };
}
