//! Validated endpoints and their dispatch.
//!
//! An [`Endpoint`] pairs a handler with the params declared for it. All
//! checks happen in [`Endpoint::new`]: argument count, provider types, body
//! readers and the return shape. A constructed endpoint can only fail at
//! request time through its providers or its handler, and every such
//! failure is written as a JSON error response.

mod error;
mod handler;
mod reply;
mod strategy;

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::StatusCode;

pub use error::{BuildError, RegistrationError};
pub use handler::{Handler, HandlerPanic, InvocationError};
pub use reply::{Json, Outcome, Payload, Reply, ReturnKind, ReturnValue};
pub use strategy::Strategy;

use handler::{HandlerFn, Invoke};
use strategy::classify;

use crate::binding::{form_error, ArgFlags, Argument, Exchange, Param};
use crate::core::{
    content_types, error_body, find_api_error, ApiError, BoxError, Context, Request, Response,
    ResponseWriter, UNKNOWN_REASON,
};
use crate::logging::Logger;
use crate::middleware::Middleware;

/// Reason sent when a handler is called with values it cannot accept.
pub const INVALID_CONSTRUCTION_REASON: &str = "invalid API construction";

/// A handler bound to its providers and response strategy.
pub struct Endpoint {
    args: Vec<Arc<dyn Argument>>,
    invoke: Box<dyn Invoke>,
    strategy: Strategy,
    status: StatusCode,
    flags: ArgFlags,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Endpoint {
    /// Validate `handler` against `params` and build the endpoint.
    pub fn new<H, A>(handler: H, params: Vec<Param>) -> Result<Self, RegistrationError>
    where
        H: Handler<A>,
        A: 'static,
    {
        let mut args = Vec::new();
        let mut status = None;
        let mut middleware = Vec::new();
        for (index, param) in params.into_iter().enumerate() {
            match param {
                Param::Argument(arg) => args.push(arg),
                Param::Status(code) => status = Some(code),
                Param::Middleware(mw) => middleware.push(mw),
                Param::Invalid(source) => return Err(RegistrationError::Param { index, source }),
            }
        }

        let flags = args
            .iter()
            .fold(ArgFlags::NONE, |acc, arg| acc.union(arg.flags()));

        let signature = H::signature();
        if signature.len() != args.len() {
            return Err(RegistrationError::ArgumentCount {
                expected: signature.len(),
                got: args.len(),
            });
        }
        for (index, (arg, ty)) in args.iter().zip(signature).enumerate() {
            arg.check(ty)
                .map_err(|source| RegistrationError::Argument { index, source })?;
        }

        if flags.body_readers > 1 {
            return Err(RegistrationError::MultipleBodyReaders);
        }

        let strategy = classify(&<H::Output as Reply>::shape(), flags.writes_response)?;
        let status = status.unwrap_or(if strategy.has_body() || flags.writes_response {
            StatusCode::OK
        } else {
            StatusCode::NO_CONTENT
        });

        Ok(Self {
            args,
            invoke: Box::new(HandlerFn::<H, A>::new(handler)),
            strategy,
            status,
            flags,
            middleware,
        })
    }

    #[inline]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Status written on success.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn flags(&self) -> ArgFlags {
        self.flags
    }

    /// Middleware declared through `middleware(..)` params.
    pub fn middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    /// Run the endpoint for one request.
    pub fn call(&self, mut req: Request, ctx: &Context, logger: &dyn Logger) -> Response {
        let response = ResponseWriter::new();
        if let Err(err) = self.run(&mut req, ctx, &response) {
            write_error(&response, ctx, logger, err.as_ref());
        }
        response.finish()
    }

    fn run(
        &self,
        req: &mut Request,
        ctx: &Context,
        response: &ResponseWriter,
    ) -> Result<(), BoxError> {
        if self.flags.parses_query {
            req.parse_form().map_err(form_error)?;
        }

        let mut ex = Exchange {
            request: req,
            context: ctx,
            response,
        };
        let mut values = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            values.push(arg.extract(&mut ex)?);
        }

        let outcome = self.invoke.invoke(values)?;
        self.respond(outcome, response)
    }

    fn respond(&self, outcome: Outcome, response: &ResponseWriter) -> Result<(), BoxError> {
        match (self.strategy, outcome) {
            (_, Outcome::Failed(err)) => Err(err),
            (Strategy::NoResponse | Strategy::ErrorOnly, Outcome::Done) => {
                response.write_header(self.status);
                Ok(())
            }
            (Strategy::Text, Outcome::Payload(Payload::Text(text))) => {
                self.write_body(response, text.as_bytes());
                Ok(())
            }
            (Strategy::Bytes, Outcome::Payload(Payload::Bytes(bytes))) => {
                self.write_body(response, &bytes);
                Ok(())
            }
            (Strategy::Json, Outcome::Payload(Payload::Json(encoded))) => {
                let encoded = encoded.map_err(|e| {
                    ApiError::wrap(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        e,
                        "cannot encode response",
                    )
                })?;
                match encoded {
                    None => response.write_header(StatusCode::NO_CONTENT),
                    Some(mut buf) => {
                        buf.push(b'\n');
                        response
                            .headers()
                            .insert(CONTENT_TYPE, content_types::APPLICATION_JSON.clone());
                        response.write_header(self.status);
                        response.write_body(&buf);
                    }
                }
                Ok(())
            }
            _ => Err(InvocationError::UnexpectedReturn.into()),
        }
    }

    fn write_body(&self, response: &ResponseWriter, body: &[u8]) {
        if body.is_empty() {
            response.write_header(StatusCode::NO_CONTENT);
        } else {
            response.write_header(self.status);
            response.write_body(body);
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("args", &self.args)
            .field("strategy", &self.strategy)
            .field("status", &self.status)
            .field("flags", &self.flags)
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Write `err` as a JSON error response and report it to `logger`.
pub(crate) fn write_error(
    response: &ResponseWriter,
    ctx: &Context,
    logger: &dyn Logger,
    err: &(dyn StdError + 'static),
) {
    let (status, body) = match find_api_error(err) {
        Some(api) => {
            logger.log_api_error(ctx, api);
            (api.status(), api.body())
        }
        None => {
            logger.log_error(ctx, err);
            let reason = if is_invocation_error(err) {
                INVALID_CONSTRUCTION_REASON
            } else {
                UNKNOWN_REASON
            };
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            (status, error_body(status, reason))
        }
    };

    response
        .headers()
        .insert(CONTENT_TYPE, content_types::APPLICATION_JSON.clone());
    response.write_header(status);
    response.write_body(&body);
}

fn is_invocation_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<InvocationError>() {
            return true;
        }
        current = e.source();
    }
    false
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingLogger;
    use super::*;
    use crate::binding::{
        as_int, byte_slice_body, context, header, json_body, query_param, required_header,
        response_status, response_writer, string_body, url_param, ParamError,
    };
    use crate::logging::NoopLogger;
    use bytes::Bytes;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    fn get(uri: &str) -> Request {
        Request::from(http::Request::get(uri).body(Bytes::new()).unwrap())
    }

    fn serve(endpoint: &Endpoint, req: Request) -> Response {
        let ctx = Context::for_request(&req, None);
        endpoint.call(req, &ctx, &NoopLogger)
    }

    fn body(res: &Response) -> &str {
        std::str::from_utf8(res.body()).unwrap()
    }

    #[test]
    fn test_argument_count() {
        let err = Endpoint::new(|_a: String| {}, vec![]).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::ArgumentCount {
                expected: 1,
                got: 0
            }
        ));

        let err = Endpoint::new(|| {}, vec![header("X")]).unwrap_err();
        assert!(matches!(err, RegistrationError::ArgumentCount { .. }));
    }

    #[test]
    fn test_argument_type_index() {
        let err = Endpoint::new(
            |_a: String, _b: u32| {},
            vec![header("A"), header("B")],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "(argument 1) expected a string type, found u32"
        );
    }

    #[test]
    fn test_invalid_param_index() {
        let invalid = Param::Invalid(ParamError::MissingDecoder);
        let err = Endpoint::new(
            |_a: String| {},
            vec![response_status(StatusCode::OK), invalid],
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::Param { index: 1, .. }));
    }

    #[test]
    fn test_multiple_body_readers() {
        let err = Endpoint::new(
            |_a: String, _b: Vec<u8>| {},
            vec![string_body(), byte_slice_body()],
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::MultipleBodyReaders));
    }

    #[test]
    fn test_return_shape_errors() {
        let err = Endpoint::new(|| String::new(), vec![]).unwrap_err();
        assert_eq!(err.to_string(), "expect an error type in return arguments");

        let err = Endpoint::new(|| (String::new(), String::new()), vec![]).unwrap_err();
        assert!(matches!(err, RegistrationError::ExpectErrorType));

        let err = Endpoint::new(|| -> Result<i64, ApiError> { Ok(1) }, vec![]).unwrap_err();
        assert!(matches!(err, RegistrationError::UnsupportedReturnType("i64")));

        let err = Endpoint::new(|| (1u8, 2u8, 3u8), vec![]).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidReturnCount(3)));

        let err = Endpoint::new(
            |_w: ResponseWriter| -> Result<String, ApiError> { Ok(String::new()) },
            vec![response_writer()],
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::WriteAndReturn));
    }

    #[test]
    fn test_default_status() {
        let ep = Endpoint::new(|| {}, vec![]).unwrap();
        assert_eq!(ep.strategy(), Strategy::NoResponse);
        assert_eq!(ep.status(), StatusCode::NO_CONTENT);

        let ep = Endpoint::new(|_w: ResponseWriter| {}, vec![response_writer()]).unwrap();
        assert_eq!(ep.status(), StatusCode::OK);

        let ep = Endpoint::new(
            || -> Result<(), ApiError> { Ok(()) },
            vec![response_status(StatusCode::ACCEPTED)],
        )
        .unwrap();
        assert_eq!(ep.strategy(), Strategy::ErrorOnly);
        assert_eq!(ep.status(), StatusCode::ACCEPTED);

        let ep = Endpoint::new(|| -> Result<String, ApiError> { Ok("x".into()) }, vec![]).unwrap();
        assert_eq!(ep.status(), StatusCode::OK);
    }

    #[test]
    fn test_text_strategy() {
        let ep = Endpoint::new(
            |q: String| -> Result<String, BoxError> { Ok(q) },
            vec![query_param("q")],
        )
        .unwrap();

        let res = serve(&ep, get("/?q=hello"));
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res), "hello");

        let res = serve(&ep, get("/"));
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(res.body().is_empty());
    }

    #[test]
    fn test_bytes_strategy_with_status() {
        let ep = Endpoint::new(
            |b: Vec<u8>| -> Result<Vec<u8>, BoxError> { Ok(b) },
            vec![byte_slice_body(), response_status(StatusCode::CREATED)],
        )
        .unwrap();

        let req = Request::from(
            http::Request::post("/")
                .body(Bytes::from_static(b"\x01\x02"))
                .unwrap(),
        );
        let res = serve(&ep, req);
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.body().as_ref(), b"\x01\x02");
    }

    #[derive(Debug, Deserialize, Serialize)]
    struct Item {
        name: String,
    }

    #[test]
    fn test_json_strategy() {
        let ep = Endpoint::new(
            |item: Box<Item>| -> Result<Option<Json<Item>>, ApiError> {
                if item.name.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Json(*item)))
                }
            },
            vec![json_body::<Item>()],
        )
        .unwrap();

        let post = |body: &'static str| {
            Request::from(
                http::Request::post("/")
                    .body(Bytes::from_static(body.as_bytes()))
                    .unwrap(),
            )
        };

        let res = serve(&ep, post(r#"{"name":"pen"}"#));
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.content_type(), Some("application/json"));
        assert_eq!(body(&res), "{\"name\":\"pen\"}\n");

        let res = serve(&ep, post(r#"{"name":""}"#));
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = serve(&ep, post("{"));
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body(&res),
            "{\"status\":400,\"reason\":\"cannot unmarshal request\"}\n"
        );
    }

    #[test]
    fn test_json_encode_failure() {
        let ep = Endpoint::new(
            || -> Result<Json<HashMap<Vec<u8>, u8>>, ApiError> {
                Ok(Json(HashMap::from([(vec![1u8], 1u8)])))
            },
            vec![],
        )
        .unwrap();
        let logger = RecordingLogger::default();
        let req = get("/");
        let ctx = Context::for_request(&req, None);

        let res = ep.call(req, &ctx, &logger);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.content_type(), Some("application/json"));
        assert_eq!(
            body(&res),
            "{\"status\":500,\"reason\":\"cannot encode response\"}\n"
        );
        assert_eq!(
            *logger.api.lock().unwrap(),
            vec![(
                StatusCode::INTERNAL_SERVER_ERROR,
                "cannot encode response".to_string()
            )]
        );
    }

    #[test]
    fn test_error_responses() {
        let ep = Endpoint::new(
            |n: i64| -> Result<(), BoxError> {
                match n {
                    0 => Ok(()),
                    1 => Err(ApiError::new(StatusCode::CONFLICT, "taken", "already exists").into()),
                    _ => Err("disk on fire".into()),
                }
            },
            vec![as_int(query_param("n"))],
        )
        .unwrap();
        let logger = RecordingLogger::default();
        let call = |uri: &str| {
            let req = get(uri);
            let ctx = Context::for_request(&req, None);
            ep.call(req, &ctx, &logger)
        };

        assert_eq!(call("/?n=0").status(), StatusCode::NO_CONTENT);

        let res = call("/?n=1");
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(
            body(&res),
            "{\"status\":409,\"reason\":\"already exists\"}\n"
        );

        let res = call("/?n=2");
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&res), "{\"status\":500,\"reason\":\"unknown\"}\n");

        let res = call("/?n=x");
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = call("/?n=%zz");
        assert_eq!(
            body(&res),
            "{\"status\":400,\"reason\":\"could not parse form\"}\n"
        );

        assert_eq!(
            *logger.api.lock().unwrap(),
            vec![
                (StatusCode::CONFLICT, "already exists".to_string()),
                (StatusCode::BAD_REQUEST, "integer parse error".to_string()),
                (StatusCode::BAD_REQUEST, "could not parse form".to_string()),
            ]
        );
        assert_eq!(*logger.other.lock().unwrap(), vec!["disk on fire".to_string()]);
    }

    #[test]
    fn test_required_header_stops_before_handler() {
        let ep = Endpoint::new(
            |_h: String| -> Result<(), ApiError> { panic!("handler must not run") },
            vec![required_header("X-Test1")],
        )
        .unwrap();
        let res = serve(&ep, get("/"));
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body(&res),
            "{\"status\":400,\"reason\":\"missing required header X-Test1\"}\n"
        );
    }

    #[test]
    fn test_response_writer_status_wins() {
        let ep = Endpoint::new(
            |w: ResponseWriter, ctx: Context| {
                w.write_header(StatusCode::IM_A_TEAPOT);
                w.write_body(ctx.path.as_bytes());
            },
            vec![response_writer(), context()],
        )
        .unwrap();
        let res = serve(&ep, get("/brew"));
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(body(&res), "/brew");
    }

    #[test]
    fn test_url_param_json_value() {
        let ep = Endpoint::new(
            |id: String| -> Result<serde_json::Value, ApiError> {
                if id.is_empty() {
                    Ok(serde_json::Value::Null)
                } else {
                    Ok(serde_json::json!({ "id": id }))
                }
            },
            vec![url_param("id")],
        )
        .unwrap();

        let mut req = get("/users/7");
        req.set_url_params(vec![("id".into(), "7".into())]);
        let res = serve(&ep, req);
        assert_eq!(body(&res), "{\"id\":\"7\"}\n");

        let res = serve(&ep, get("/users/"));
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_invocation_error_reason() {
        let response = ResponseWriter::new();
        let err: BoxError = InvocationError::UnexpectedReturn.into();
        write_error(&response, &Context::new(), &NoopLogger, err.as_ref());
        let res = response.finish();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(&res),
            "{\"status\":500,\"reason\":\"invalid API construction\"}\n"
        );
    }
}
