/// Generate client methods with oneshot channel boilerplate and automatic tracing.
///
/// Channel failures map to the error type's `ActorCommunicationError` variant.
macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident, Error = $error_type:ty) => {
        impl $client {
            #[::tracing::instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, $error_type> {
                ::tracing::debug!("Sending request");
                let (respond_to, response) = ::tokio::sync::oneshot::channel();
                self.sender.send($request::$variant {
                    $($param,)*
                    respond_to,
                }).await.map_err(|_| <$error_type>::ActorCommunicationError("Actor closed".to_string()))?;

                response.await.map_err(|_| <$error_type>::ActorCommunicationError("Actor dropped".to_string()))?
            }
        }
    };
}

/// Adds a `shutdown` method that asks the actor to leave its run loop.
macro_rules! client_shutdown {
    ($client:ty => $request:ident) => {
        impl $client {
            #[::tracing::instrument(skip(self))]
            pub async fn shutdown(&self) -> Result<(), String> {
                ::tracing::debug!("Sending shutdown request");
                self.sender
                    .send($request::Shutdown)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(())
            }
        }
    };
}
