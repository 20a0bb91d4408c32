use oso::{Oso, PolarClass};

use crate::auth::{Platform, User};
use crate::entities::{Job, Member};
use crate::error::Error;

pub fn new() -> Result<Oso, Error> {
    let mut o = Oso::new();

    o.register_class(Platform::get_polar_class())?;
    o.register_class(User::get_polar_class())?;
    o.register_class(Job::get_polar_class())?;
    o.register_class(Member::get_polar_class())?;

    o.load_str(include_str!("rules.polar"))?;

    Ok(o)
}

#[cfg(test)]
fn user(role: crate::entities::Role) -> User {
    User::new(uuid::Uuid::new_v4(), role)
}

#[cfg(test)]
fn open_job(requester: &User) -> Job {
    use crate::entities::{job::test_request, BookingType};

    Job::new(requester.id, test_request(BookingType::Distance), None).unwrap()
}

#[test]
fn platform_permissions_test() {
    use crate::entities::Role;

    let authorizor = new().unwrap();
    let platform = Platform::default();

    let client = user(Role::Client);
    let agency = user(Role::Agency);
    let driver = user(Role::Driver);
    let admin = user(Role::Admin);

    assert!(authorizor.is_allowed(client.clone(), "create_job", platform.clone()).unwrap());
    assert!(authorizor.is_allowed(agency.clone(), "create_job", platform.clone()).unwrap());
    assert!(!authorizor.is_allowed(driver.clone(), "create_job", platform.clone()).unwrap());

    assert!(authorizor.is_allowed(agency.clone(), "book_for_guest", platform.clone()).unwrap());
    assert!(!authorizor.is_allowed(client.clone(), "book_for_guest", platform.clone()).unwrap());

    assert!(authorizor.is_allowed(driver.clone(), "read_pricing", platform.clone()).unwrap());
    assert!(!authorizor.is_allowed(driver.clone(), "manage_pricing", platform.clone()).unwrap());
    assert!(authorizor.is_allowed(admin.clone(), "manage_pricing", platform.clone()).unwrap());
}

#[test]
fn job_requester_test() {
    use crate::entities::Role;

    let authorizor = new().unwrap();

    let requester = user(Role::Client);
    let stranger = user(Role::Client);
    let job = open_job(&requester);

    let result = authorizor.query_rule("participant", (requester.clone(), job.clone()));
    assert!(result.unwrap().next().unwrap().is_ok());

    assert!(authorizor.is_allowed(requester.clone(), "read", job.clone()).unwrap());
    assert!(authorizor.is_allowed(requester.clone(), "update", job.clone()).unwrap());
    assert!(authorizor.is_allowed(requester.clone(), "accept_bid", job.clone()).unwrap());
    assert!(authorizor.is_allowed(requester.clone(), "cancel", job.clone()).unwrap());
    assert!(!authorizor.is_allowed(requester.clone(), "bid", job.clone()).unwrap());
    assert!(!authorizor.is_allowed(requester.clone(), "advance", job.clone()).unwrap());

    assert!(!authorizor.is_allowed(stranger.clone(), "read", job.clone()).unwrap());
    assert!(!authorizor.is_allowed(stranger.clone(), "cancel", job.clone()).unwrap());
}

#[test]
fn job_driver_test() {
    use crate::entities::{Bid, Role};

    let authorizor = new().unwrap();

    let requester = user(Role::Client);
    let driver = user(Role::Driver);
    let mut job = open_job(&requester);

    // open job: any driver may look and bid, nothing else

    assert!(authorizor.is_allowed(driver.clone(), "read", job.clone()).unwrap());
    assert!(authorizor.is_allowed(driver.clone(), "bid", job.clone()).unwrap());
    assert!(!authorizor.is_allowed(driver.clone(), "advance", job.clone()).unwrap());
    assert!(!authorizor.is_allowed(driver.clone(), "cancel", job.clone()).unwrap());

    let bid = Bid::new(driver.id, 30.0, "Skoda Octavia".into(), "Economy".into(), None);
    let bid_id = bid.id;
    job.place_bid(bid).unwrap();
    job.accept_bid(bid_id).unwrap();

    // assigned driver

    assert!(authorizor.is_allowed(driver.clone(), "read", job.clone()).unwrap());
    assert!(authorizor.is_allowed(driver.clone(), "advance", job.clone()).unwrap());
    assert!(authorizor.is_allowed(driver.clone(), "cancel", job.clone()).unwrap());
    assert!(authorizor.is_allowed(driver.clone(), "dispute", job.clone()).unwrap());
    assert!(!authorizor.is_allowed(driver.clone(), "bid", job.clone()).unwrap());
    assert!(!authorizor.is_allowed(driver.clone(), "accept_bid", job.clone()).unwrap());

    // other drivers lose sight of the job once it is taken

    let other_driver = user(Role::Driver);
    assert!(!authorizor.is_allowed(other_driver.clone(), "read", job.clone()).unwrap());
    assert!(!authorizor.is_allowed(other_driver.clone(), "advance", job.clone()).unwrap());
}

#[test]
fn job_admin_test() {
    use crate::entities::Role;

    let authorizor = new().unwrap();

    let admin = user(Role::Admin);
    let job = open_job(&user(Role::Client));

    for action in ["read", "update", "accept_bid", "cancel", "reject", "resolve", "message"] {
        assert!(authorizor.is_allowed(admin.clone(), action, job.clone()).unwrap(), "{}", action);
    }

    assert!(!authorizor.is_allowed(admin.clone(), "bid", job.clone()).unwrap());
    assert!(!authorizor.is_allowed(admin.clone(), "advance", job.clone()).unwrap());
    assert!(!authorizor.is_allowed(admin.clone(), "dispute", job.clone()).unwrap());
}

#[test]
fn member_test() {
    use crate::entities::{Member, Registration, Role};

    let authorizor = new().unwrap();

    let registration = Registration {
        email: "driver@example.com".into(),
        name: "Driver".into(),
        password: "irrelevant".into(),
        role: Role::Driver,
        company: None,
    };
    let member = Member::new(&registration, "hash".into()).unwrap();

    let myself = User::new(member.id, Role::Driver);
    let other = user(Role::Driver);
    let admin = user(Role::Admin);

    assert!(authorizor.is_allowed(myself.clone(), "read", member.clone()).unwrap());
    assert!(authorizor.is_allowed(myself.clone(), "manage", member.clone()).unwrap());
    assert!(!authorizor.is_allowed(myself.clone(), "review", member.clone()).unwrap());

    assert!(!authorizor.is_allowed(other.clone(), "read", member.clone()).unwrap());

    assert!(authorizor.is_allowed(admin.clone(), "review", member.clone()).unwrap());
    assert!(authorizor.is_allowed(admin.clone(), "payout", member.clone()).unwrap());
}
