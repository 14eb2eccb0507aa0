#![allow(dead_code)]

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Parsed HTTP reply.
    #[derive(Debug)]
    pub struct Reply {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl Reply {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Write a raw request and read until the server closes the connection.
    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn parse_response(raw: &str) -> Reply {
        let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        Reply {
            status,
            headers,
            body: body.to_string(),
        }
    }

    pub fn get(addr: &SocketAddr, target: &str) -> Reply {
        let raw = send_request(
            addr,
            &format!("GET {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"),
        );
        parse_response(&raw)
    }
}

pub mod fixtures {
    use actionserver::controller::{Controller, ControllerDefinition};
    use actionserver::escalation::{Behavior, ExceptionPolicy};
    use actionserver::middleware::RequiredParameters;
    use actionserver::params::Parameters;
    use actionserver::registry::{ControllerRegistry, RegistryBuilder};
    use actionserver::response::Response;
    use actionserver::router::Router;
    use anyhow::Context;
    use std::sync::Arc;

    pub struct ExampleController {
        params: Parameters,
    }

    impl Controller for ExampleController {
        fn from_parameters(params: Parameters) -> Self {
            Self { params }
        }
        fn parameters(&self) -> &Parameters {
            &self.params
        }
    }

    /// `Example` controller: `echo` requires `name`; `explode` fails with a
    /// two-link error chain and blocks clients.
    pub fn example_definition() -> ControllerDefinition<ExampleController> {
        ControllerDefinition::<ExampleController>::new("Example")
            .action("Echo", |c: &mut ExampleController| {
                let name = c.parameters().get("name").unwrap_or_default().to_string();
                Ok(Response::ok("Echo", format!("Hello {name}")))
            })
            .require(RequiredParameters::parse("name"))
            .action("Explode", |_| {
                Err(anyhow::anyhow!("database offline")).context("could not load record")
            })
            .on_error(ExceptionPolicy::log(Behavior::BlockClients))
            .finish()
    }

    pub fn example_registry() -> Arc<ControllerRegistry> {
        let mut builder = RegistryBuilder::new();
        builder.register(example_definition()).unwrap();
        builder.build()
    }

    pub fn example_router() -> Router {
        Router::new(example_registry())
    }
}

pub mod test_server {
    use super::http::{get, Reply};
    use actionserver::router::Router;
    use actionserver::server::Server;
    use actionserver::worker_pool::{CoroutineSpawner, TaskSpawner};
    use std::net::SocketAddr;
    use std::sync::{Arc, Once};
    use std::time::Duration;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// Running server on an ephemeral port, shut down on drop.
    pub struct TestServer {
        pub server: Server,
        pub addr: SocketAddr,
    }

    impl TestServer {
        pub fn start(router: Router) -> Self {
            Self::start_with(router, Arc::new(CoroutineSpawner::new(0x8000)))
        }

        pub fn start_with(router: Router, spawner: Arc<dyn TaskSpawner>) -> Self {
            setup_may_runtime();
            let mut server = Server::new("127.0.0.1:0", router, spawner)
                .with_shutdown_grace(Duration::from_millis(500));
            server.start().unwrap();
            let addr = server.local_addr().unwrap();
            Self { server, addr }
        }

        pub fn get(&self, target: &str) -> Reply {
            get(&self.addr, target)
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            let _ = self.server.shutdown();
        }
    }
}
