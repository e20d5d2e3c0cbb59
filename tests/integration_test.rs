use sigae_bulk::config::{Config, Credentials};
use sigae_bulk::logger;
use sigae_bulk::models::ProgramType;
use sigae_bulk::services::{Lookup, PortalDriver, SigaePortal};

#[tokio::test]
#[ignore] // needs a browser and portal access: cargo test -- --ignored
async fn test_login_and_listing() {
    logger::init();

    let config = Config::from_env().expect("invalid configuration");
    let credentials = Credentials::from_env().expect("SIGAE_USER / SIGAE_PASSWORD not set");

    let mut portal = SigaePortal::open(&config)
        .await
        .expect("failed to open the browser");

    let logged_in = portal.authenticate(&credentials).await.expect("login failed");
    assert!(logged_in, "credentials should be accepted");

    for program in [ProgramType::Pnf, ProgramType::Pnfa] {
        let arrived = portal
            .navigate_to_listing(program)
            .await
            .expect("navigation failed");
        assert!(arrived, "{} listing should load", program);
    }

    portal.close().await;
}

#[tokio::test]
#[ignore]
async fn test_unknown_identifier_is_not_found() {
    logger::init();

    let config = Config::from_env().expect("invalid configuration");
    let credentials = Credentials::from_env().expect("SIGAE_USER / SIGAE_PASSWORD not set");
    let mut portal = SigaePortal::open(&config)
        .await
        .expect("failed to open the browser");

    assert!(portal.authenticate(&credentials).await.unwrap());
    let lookup = portal
        .locate_record("000000001", ProgramType::Pnf)
        .await
        .expect("search failed");
    assert_eq!(lookup, Lookup::NotFound);

    portal.close().await;
}
