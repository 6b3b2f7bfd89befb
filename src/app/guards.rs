use actix_web::guard::{Guard, GuardContext};
use log::warn;

// A guard will just cause the router to not match the
// route and thus show a 404. What I'd need would be a
// middleware and not a guard. But it does the trick
// anyway.
#[derive(Clone)]
pub struct IPRestrictedGuard<T: 'static + AsRef<str>> {
  allowed_ip_addresses: &'static [T]
}

impl<T: AsRef<str>> IPRestrictedGuard<T> {
  pub fn new(allowed_ips: &'static [T]) -> Self {
    Self {
      allowed_ip_addresses: allowed_ips
    }
  }
}

impl<T: AsRef<str>> Guard for IPRestrictedGuard<T> {
  fn check(&self, ctx: &GuardContext<'_>) -> bool {
    let head = ctx.head();
    match head.peer_addr {
      Some(sock_addr) => {
        let addr = sock_addr.ip().to_string();
        if self.allowed_ip_addresses.iter().any(|i| i.as_ref() == addr) {
          true
        } else {
          warn!("IP address {} attempted to reach protected \
            endpoint at {}", addr, head.uri);
          false
        }
      },
      None => false
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  const ALLOWED: [&'static str; 2] = ["127.0.0.1", "::1"];

  #[test]
  fn loopback_is_allowed() {
    let sut = IPRestrictedGuard::new(&ALLOWED);
    let req = TestRequest::default()
      .peer_addr("127.0.0.1:4567".parse().unwrap())
      .to_srv_request();
    assert!(sut.check(&req.guard_ctx()));
  }

  #[test]
  fn others_are_not() {
    let sut = IPRestrictedGuard::new(&ALLOWED);
    let req = TestRequest::default()
      .peer_addr("10.1.2.3:4567".parse().unwrap())
      .to_srv_request();
    assert!(!sut.check(&req.guard_ctx()));
    let req = TestRequest::default().to_srv_request();
    assert!(!sut.check(&req.guard_ctx()));
  }
}
