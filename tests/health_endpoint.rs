use ksaekvat::bot::health;
use ksaekvat::config::HealthConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn any_request_gets_ok_and_the_fixed_body() {
    let cfg = HealthConfig {
        enabled: true,
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let listener = health::bind(&cfg).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(health::serve(listener));

    for (method, path) in [("GET", "/"), ("GET", "/anything?x=1"), ("POST", "/status")] {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "{} {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: 0\r\n\r\n",
            method, path
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"), "got {}", response);
        assert!(response.ends_with(health::HEALTH_BODY));
    }

    server.abort();
}
