//! Interceptor chain composition.
//!
//! An ordered list of interceptors is folded into a single entry point the
//! transport layer invokes once per call: the first interceptor added is the
//! outermost layer, the terminal business handler runs last. Each stage only
//! knows one capability, "handle the call and maybe invoke `next`", so every
//! stage can be unit-tested against a stub next.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use tonic::{Request, Response, Status};

/// Type-erased request or response message of a unary call.
pub type BoxMessage = Box<dyn Any + Send + 'static>;

/// Message flow of a streaming call.
pub type MessageStream = BoxStream<'static, Result<BoxMessage, Status>>;

/// Terminal stage of a unary call: the business handler.
pub type UnaryHandler =
    Arc<dyn Fn(Request<BoxMessage>) -> BoxFuture<'static, Result<Response<BoxMessage>, Status>> + Send + Sync>;

/// Terminal stage of a streaming call.
pub type StreamHandler = Arc<
    dyn Fn(Request<MessageStream>) -> BoxFuture<'static, Result<Response<MessageStream>, Status>>
        + Send
        + Sync,
>;

/// Per-call method metadata, identical for every layer of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    full_method: String,
}

impl CallInfo {
    pub fn new(full_method: impl Into<String>) -> Self {
        Self {
            full_method: full_method.into(),
        }
    }

    /// Fully-qualified method name, e.g. `/management.Management/CreatePlan`.
    pub fn full_method(&self) -> &str {
        &self.full_method
    }
}

/// One stage of the unary chain.
#[async_trait]
pub trait UnaryInterceptor: Send + Sync {
    async fn call(
        &self,
        request: Request<BoxMessage>,
        info: &CallInfo,
        next: UnaryNext<'_>,
    ) -> Result<Response<BoxMessage>, Status>;
}

/// One stage of the streaming chain.
#[async_trait]
pub trait StreamInterceptor: Send + Sync {
    async fn call(
        &self,
        request: Request<MessageStream>,
        info: &CallInfo,
        next: StreamNext<'_>,
    ) -> Result<Response<MessageStream>, Status>;
}

/// The remainder of the chain after the current unary stage.
pub struct UnaryNext<'a> {
    interceptors: &'a [Arc<dyn UnaryInterceptor>],
    info: &'a CallInfo,
    handler: &'a UnaryHandler,
}

impl UnaryNext<'_> {
    /// Forwards the call to the next stage.
    pub async fn run(self, request: Request<BoxMessage>) -> Result<Response<BoxMessage>, Status> {
        match self.interceptors.split_first() {
            Some((current, rest)) => {
                let next = UnaryNext {
                    interceptors: rest,
                    info: self.info,
                    handler: self.handler,
                };
                current.call(request, self.info, next).await
            }
            None => (self.handler)(request).await,
        }
    }
}

/// The remainder of the chain after the current streaming stage.
pub struct StreamNext<'a> {
    interceptors: &'a [Arc<dyn StreamInterceptor>],
    info: &'a CallInfo,
    handler: &'a StreamHandler,
}

impl StreamNext<'_> {
    /// Forwards the call to the next stage.
    pub async fn run(
        self,
        request: Request<MessageStream>,
    ) -> Result<Response<MessageStream>, Status> {
        match self.interceptors.split_first() {
            Some((current, rest)) => {
                let next = StreamNext {
                    interceptors: rest,
                    info: self.info,
                    handler: self.handler,
                };
                current.call(request, self.info, next).await
            }
            None => (self.handler)(request).await,
        }
    }
}

/// Ordered interceptor chain for both call shapes.
#[derive(Default)]
pub struct InterceptorChain {
    unary: Vec<Arc<dyn UnaryInterceptor>>,
    stream: Vec<Arc<dyn StreamInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor that participates in both call shapes.
    pub fn with<I>(mut self, interceptor: Arc<I>) -> Self
    where
        I: UnaryInterceptor + StreamInterceptor + 'static,
    {
        self.unary.push(interceptor.clone());
        self.stream.push(interceptor);
        self
    }

    /// Appends a unary-only interceptor.
    pub fn with_unary(mut self, interceptor: Arc<dyn UnaryInterceptor>) -> Self {
        self.unary.push(interceptor);
        self
    }

    /// Appends a streaming-only interceptor.
    pub fn with_stream(mut self, interceptor: Arc<dyn StreamInterceptor>) -> Self {
        self.stream.push(interceptor);
        self
    }

    /// Entry point for a unary call.
    pub async fn dispatch_unary(
        &self,
        request: Request<BoxMessage>,
        info: &CallInfo,
        handler: &UnaryHandler,
    ) -> Result<Response<BoxMessage>, Status> {
        UnaryNext {
            interceptors: &self.unary,
            info,
            handler,
        }
        .run(request)
        .await
    }

    /// Entry point for a streaming call.
    pub async fn dispatch_stream(
        &self,
        request: Request<MessageStream>,
        info: &CallInfo,
        handler: &StreamHandler,
    ) -> Result<Response<MessageStream>, Status> {
        StreamNext {
            interceptors: &self.stream,
            info,
            handler,
        }
        .run(request)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        label: &'static str,
        order: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl UnaryInterceptor for Recording {
        async fn call(
            &self,
            request: Request<BoxMessage>,
            info: &CallInfo,
            next: UnaryNext<'_>,
        ) -> Result<Response<BoxMessage>, Status> {
            self.order
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, info.full_method()));
            next.run(request).await
        }
    }

    fn noop_handler(order: Arc<Mutex<Vec<String>>>) -> UnaryHandler {
        Arc::new(move |_request| {
            let order = order.clone();
            Box::pin(async move {
                order.lock().unwrap().push("handler".to_string());
                Ok(Response::new(Box::new(()) as BoxMessage))
            })
        })
    }

    #[tokio::test]
    async fn first_interceptor_is_outermost() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::new()
            .with_unary(Arc::new(Recording {
                label: "outer",
                order: order.clone(),
            }))
            .with_unary(Arc::new(Recording {
                label: "inner",
                order: order.clone(),
            }));

        let info = CallInfo::new("/svc.Test/Ping");
        let handler = noop_handler(order.clone());
        let request = Request::new(Box::new(()) as BoxMessage);

        chain
            .dispatch_unary(request, &info, &handler)
            .await
            .expect("dispatch should succeed");

        assert_eq!(
            *order.lock().unwrap(),
            vec!["outer:/svc.Test/Ping", "inner:/svc.Test/Ping", "handler"]
        );
    }

    #[tokio::test]
    async fn empty_chain_invokes_handler_directly() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::new();

        let info = CallInfo::new("/svc.Test/Ping");
        let handler = noop_handler(order.clone());
        let request = Request::new(Box::new(()) as BoxMessage);

        chain
            .dispatch_unary(request, &info, &handler)
            .await
            .expect("dispatch should succeed");

        assert_eq!(*order.lock().unwrap(), vec!["handler"]);
    }

    struct Rejecting;

    #[async_trait]
    impl UnaryInterceptor for Rejecting {
        async fn call(
            &self,
            _request: Request<BoxMessage>,
            _info: &CallInfo,
            _next: UnaryNext<'_>,
        ) -> Result<Response<BoxMessage>, Status> {
            Err(Status::permission_denied("nope"))
        }
    }

    #[tokio::test]
    async fn rejection_short_circuits_inner_stages() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::new()
            .with_unary(Arc::new(Rejecting))
            .with_unary(Arc::new(Recording {
                label: "inner",
                order: order.clone(),
            }));

        let info = CallInfo::new("/svc.Test/Ping");
        let handler = noop_handler(order.clone());
        let request = Request::new(Box::new(()) as BoxMessage);

        let err = chain
            .dispatch_unary(request, &info, &handler)
            .await
            .expect_err("dispatch should be rejected");

        assert_eq!(err.code(), tonic::Code::PermissionDenied);
        assert!(order.lock().unwrap().is_empty());
    }
}
