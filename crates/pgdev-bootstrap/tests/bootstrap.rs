use pgdev_bootstrap::{Bootstrapper, Installation};
use pgdev_config::{DatabaseSpec, InitialScript, current_user};
use pgdev_test_support::fixtures::postgres_available;
use pgdev_test_support::postgres::TestInstance;

fn runnable(test: &str) -> Option<String> {
    if !postgres_available() {
        eprintln!("skipping {test}: postgres binaries unavailable");
        return None;
    }
    match current_user() {
        Ok(user) if user != "root" => Some(user),
        Ok(_) => {
            eprintln!("skipping {test}: postgres refuses to run as root");
            None
        }
        Err(err) => {
            eprintln!("skipping {test}: {err}");
            None
        }
    }
}

#[tokio::test]
async fn first_start_creates_databases_and_second_start_is_a_no_op() -> anyhow::Result<()> {
    let Some(user) = runnable("first_start_creates_databases_and_second_start_is_a_no_op")
    else {
        return Ok(());
    };
    let mut instance = TestInstance::new("pg1")?;
    let schema = instance.write_schema("schemas/001_items.sql", "CREATE TABLE items (id int);")?;
    let config = instance.config_mut();
    config.initial_databases = vec![DatabaseSpec {
        name: "app".into(),
        schemas: Some(vec![schema.parent().map(ToOwned::to_owned).unwrap_or_default()]),
    }];
    config.initial_script = InitialScript {
        before: Some("CREATE ROLE app_owner".into()),
        after: Some("ALTER DATABASE app OWNER TO app_owner".into()),
    };

    let installation = Installation::resolve(&instance.config().package)?;
    let bootstrapper = Bootstrapper::new(instance.config().clone(), installation, user);

    let first = bootstrapper.run().await?;
    assert!(first.initialized_cluster);
    assert!(!first.skipped);
    let outcome = first.outcome.expect("first run executes the plan");
    assert_eq!(outcome.created, vec!["app"]);
    assert_eq!(outcome.schemas_applied, 1);
    assert_eq!(outcome.scripts_run, 2);
    assert!(instance.config().init_marker().is_file());
    assert!(instance.config().hba_file().is_file());

    let second = bootstrapper.run().await?;
    assert!(!second.initialized_cluster);
    assert!(second.skipped);
    assert!(second.outcome.is_none());
    Ok(())
}

#[tokio::test]
async fn default_database_is_named_after_the_user() -> anyhow::Result<()> {
    let Some(user) = runnable("default_database_is_named_after_the_user") else {
        return Ok(());
    };
    let instance = TestInstance::new("pg2")?;
    let installation = Installation::resolve(&instance.config().package)?;
    let report = Bootstrapper::new(instance.config().clone(), installation, user.clone())
        .run()
        .await?;
    let outcome = report.outcome.expect("plan executed");
    assert_eq!(outcome.created, vec![user]);
    Ok(())
}
