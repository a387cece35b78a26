use crate::api_client::GraphqlTransport;
use crate::graphql::GraphqlRequest;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;

/// The two service categories the control plane attaches to apps. Both
/// categories share one generic create/delete/link/unlink/list/exists
/// implementation; only this value differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Postgres,
    Redis,
}

impl ServiceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Postgres => "postgres",
            ServiceType::Redis => "redis",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rendered result of one command, carrying its exit code.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Done(String),
    Failed(String),
    Found(String),
    NotFound(Vec<String>),
    Listing(Vec<String>),
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Done(_) | Outcome::Found(_) | Outcome::Listing(_) => 0,
            Outcome::Failed(_) | Outcome::NotFound(_) => 1,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done(subject) => write!(f, "====> {subject}!"),
            Outcome::Failed(error) => write!(f, " !    {error}"),
            Outcome::Found(name) => write!(f, "{name} exists"),
            Outcome::NotFound(lines) | Outcome::Listing(lines) => f.write_str(&lines.join("\n")),
        }
    }
}

#[derive(Debug)]
pub struct Runner<T> {
    transport: T,
}

impl<T: GraphqlTransport> Runner<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn apps_list(&self) -> Result<Outcome> {
        const QUERY: &str = "
query apps($page: Int!, $allApps: Boolean!) {
  apps(page: $page, allApps: $allApps) {
    apps {
      name
    }
    nextPage
  }
}
";

        let mut names = Vec::new();
        let mut page: u32 = 1;

        while page != 0 {
            log::debug!("Fetching apps page {page}...");

            let response: AppsResponse = self.query(
                &GraphqlRequest::new(QUERY)
                    .var("allApps", true)
                    .var("page", page),
            )?;

            names.extend(response.apps.apps.into_iter().map(|app| app.name));

            // A server that answers with the page just requested must not
            // cause an endless request loop.
            if response.apps.next_page == page {
                break;
            }
            page = response.apps.next_page;
        }

        names.sort();
        Ok(Outcome::Listing(names))
    }

    pub fn apps_create(&self, name: &str) -> Result<Outcome> {
        const MUTATION: &str = "
mutation AddApp($name: String!) {
  addApp(name: $name) {
    app {
      name
    }
    error
  }
}
";

        ensure_name(name)?;

        let response: AddAppResponse =
            self.query(&GraphqlRequest::new(MUTATION).var("name", name))?;
        let added = response.add_app;

        if !added.error.is_empty() {
            return Ok(Outcome::Failed(added.error));
        }

        let created = added.app.map_or_else(|| name.to_string(), |app| app.name);
        Ok(Outcome::Done(format!("{created} created")))
    }

    pub fn apps_delete(&self, name: &str) -> Result<Outcome> {
        const MUTATION: &str = "
mutation DeleteApp($name: String!) {
  deleteApp(name: $name) {
    ok
    error
  }
}
";

        ensure_name(name)?;

        let response: DeleteAppResponse =
            self.query(&GraphqlRequest::new(MUTATION).var("name", name))?;

        Ok(ack_outcome(response.delete_app, format!("{name} deleted")))
    }

    pub fn app_exists(&self, name: &str) -> Result<Outcome> {
        const QUERY: &str = "
query apps($name: String!, $allApps: Boolean!) {
  apps(name: $name, allApps: $allApps) {
    apps {
      name
    }
  }
}
";

        ensure_name(name)?;

        let response: AppsResponse = self.query(
            &GraphqlRequest::new(QUERY)
                .var("allApps", false)
                .var("name", name),
        )?;

        match response.apps.apps.into_iter().next() {
            Some(app) => Ok(Outcome::Found(app.name)),
            None => Ok(Outcome::NotFound(vec![
                format!("{name} not found. Possible causes:"),
                "- You may not have been granted access to this app.".to_string(),
                "- The app may not exist (or may not have been deployed yet).".to_string(),
                "- The app is broken and could not be started.".to_string(),
            ])),
        }
    }

    pub fn service_create(&self, service_type: ServiceType, name: &str) -> Result<Outcome> {
        const MUTATION: &str = "
mutation AddService($name: String!, $serviceType: ServiceType!) {
  addService(name: $name, serviceType: $serviceType) {
    service {
      name
      serviceType
      created
    }
    error
  }
}
";

        ensure_name(name)?;

        let response: AddServiceResponse = self.query(
            &GraphqlRequest::new(MUTATION)
                .var("name", name)
                .var("serviceType", service_type.as_str()),
        )?;

        Ok(ack_outcome(response.add_service, format!("{name} created")))
    }

    pub fn service_delete(&self, service_type: ServiceType, name: &str) -> Result<Outcome> {
        const MUTATION: &str = "
mutation DeleteService($name: String!, $serviceType: ServiceType!) {
  deleteService(name: $name, serviceType: $serviceType) {
    ok
    error
  }
}
";

        ensure_name(name)?;

        let response: DeleteServiceResponse = self.query(
            &GraphqlRequest::new(MUTATION)
                .var("name", name)
                .var("serviceType", service_type.as_str()),
        )?;

        Ok(ack_outcome(response.delete_service, format!("{name} deleted")))
    }

    pub fn service_exists(&self, service_type: ServiceType, name: &str) -> Result<Outcome> {
        ensure_name(name)?;

        let services = self.fetch_services()?;

        // Two services of different types may share a name.
        let found = services
            .into_iter()
            .find(|service| service.name == name && service.service_type == service_type.as_str());

        match found {
            Some(service) => Ok(Outcome::Found(service.name)),
            None => Ok(Outcome::NotFound(vec![
                format!("{name} not found. Possible causes:"),
                "- You may not have been granted access to this service.".to_string(),
                "- The service may not exist.".to_string(),
            ])),
        }
    }

    pub fn service_list(&self, service_type: ServiceType) -> Result<Outcome> {
        log::debug!("Listing {service_type} services...");

        let names = self
            .fetch_services()?
            .into_iter()
            .filter(|service| service.service_type == service_type.as_str())
            .map(|service| service.name)
            .collect();

        Ok(Outcome::Listing(names))
    }

    pub fn service_link(&self, service_type: ServiceType, name: &str, app: &str) -> Result<Outcome> {
        const MUTATION: &str = "
mutation LinkService($appname: String!, $serviceName: String!, $serviceType: ServiceType!) {
  linkService(appname: $appname, serviceType: $serviceType, serviceName: $serviceName) {
    ok
    error
  }
}
";

        ensure_name(name)?;
        ensure_app(app)?;

        let response: LinkServiceResponse = self.query(
            &GraphqlRequest::new(MUTATION)
                .var("appname", app)
                .var("serviceName", name)
                .var("serviceType", service_type.as_str()),
        )?;

        Ok(ack_outcome(response.link_service, format!("{app} linked")))
    }

    pub fn service_unlink(
        &self,
        service_type: ServiceType,
        name: &str,
        app: &str,
    ) -> Result<Outcome> {
        const MUTATION: &str = "
mutation UnlinkService($appname: String!, $serviceName: String!, $serviceType: ServiceType!) {
  unlinkService(appname: $appname, serviceType: $serviceType, serviceName: $serviceName) {
    ok
    error
  }
}
";

        ensure_name(name)?;
        ensure_app(app)?;

        let response: UnlinkServiceResponse = self.query(
            &GraphqlRequest::new(MUTATION)
                .var("appname", app)
                .var("serviceName", name)
                .var("serviceType", service_type.as_str()),
        )?;

        Ok(ack_outcome(response.unlink_service, format!("{app} unlinked")))
    }

    fn fetch_services(&self) -> Result<Vec<Service>> {
        const QUERY: &str = "
{
    services {
        name
        serviceType
        created
    }
}
";

        let response: ServicesResponse = self.query(&GraphqlRequest::new(QUERY))?;
        Ok(response.services)
    }

    fn query<R: DeserializeOwned>(&self, request: &GraphqlRequest) -> Result<R> {
        let data = self.transport.execute(request)?;
        serde_json::from_value(data).context("unexpected response shape")
    }
}

fn ensure_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("No name specified");
    }
    Ok(())
}

fn ensure_app(app: &str) -> Result<()> {
    if app.is_empty() {
        bail!("No app specified");
    }
    Ok(())
}

fn ack_outcome(ack: Ack, subject: String) -> Outcome {
    if ack.error.is_empty() {
        Outcome::Done(subject)
    } else {
        Outcome::Failed(ack.error)
    }
}

#[derive(Deserialize, Debug)]
struct AppsResponse {
    apps: AppsPage,
}

#[derive(Deserialize, Debug)]
struct AppsPage {
    apps: Vec<App>,
    #[serde(default, rename = "nextPage")]
    next_page: u32,
}

#[derive(Deserialize, Debug)]
struct App {
    name: String,
}

#[derive(Deserialize, Debug)]
struct AddAppResponse {
    #[serde(rename = "addApp")]
    add_app: AddApp,
}

#[derive(Deserialize, Debug)]
struct AddApp {
    app: Option<App>,
    #[serde(default)]
    error: String,
}

#[derive(Deserialize, Debug)]
struct DeleteAppResponse {
    #[serde(rename = "deleteApp")]
    delete_app: Ack,
}

#[derive(Deserialize, Debug)]
struct ServicesResponse {
    services: Vec<Service>,
}

#[derive(Deserialize, Debug)]
struct Service {
    name: String,
    #[serde(rename = "serviceType")]
    service_type: String,
}

#[derive(Deserialize, Debug)]
struct AddServiceResponse {
    #[serde(rename = "addService")]
    add_service: Ack,
}

#[derive(Deserialize, Debug)]
struct DeleteServiceResponse {
    #[serde(rename = "deleteService")]
    delete_service: Ack,
}

#[derive(Deserialize, Debug)]
struct LinkServiceResponse {
    #[serde(rename = "linkService")]
    link_service: Ack,
}

#[derive(Deserialize, Debug)]
struct UnlinkServiceResponse {
    #[serde(rename = "unlinkService")]
    unlink_service: Ack,
}

/// Mutation acknowledgement; only the error string decides the outcome.
#[derive(Deserialize, Debug)]
struct Ack {
    #[serde(default)]
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::cell::RefCell;

    struct FakeTransport {
        responses: RefCell<Vec<Value>>,
        requests: RefCell<Vec<GraphqlRequest>>,
    }

    impl FakeTransport {
        fn new(responses: Vec<Value>) -> Self {
            Self {
                responses: RefCell::new(responses),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn single(response: Value) -> Self {
            Self::new(vec![response])
        }
    }

    impl GraphqlTransport for FakeTransport {
        fn execute(&self, request: &GraphqlRequest) -> Result<Value> {
            self.requests.borrow_mut().push(request.clone());

            let mut responses = self.responses.borrow_mut();
            if responses.is_empty() {
                anyhow::bail!("no canned response left for request");
            }
            Ok(responses.remove(0))
        }
    }

    #[test]
    fn apps_list_accumulates_pages_until_next_page_repeats() {
        let runner = Runner::new(FakeTransport::new(vec![
            json!({"apps": {"apps": [{"name": "charlie"}], "nextPage": 2}}),
            json!({"apps": {"apps": [{"name": "alpha"}], "nextPage": 3}}),
            json!({"apps": {"apps": [{"name": "bravo"}], "nextPage": 3}}),
        ]));

        let outcome = runner.apps_list().unwrap();

        assert_eq!(
            outcome,
            Outcome::Listing(vec!["alpha".into(), "bravo".into(), "charlie".into()])
        );

        let requests = runner.transport.requests.borrow();
        let pages: Vec<_> = requests
            .iter()
            .map(|request| request.variables["page"].clone())
            .collect();
        assert_eq!(pages, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn apps_list_stops_when_next_page_is_zero() {
        let runner = Runner::new(FakeTransport::single(json!({
            "apps": {"apps": [{"name": "zulu"}, {"name": "alpha"}], "nextPage": 0}
        })));

        let outcome = runner.apps_list().unwrap();

        assert_eq!(
            outcome,
            Outcome::Listing(vec!["alpha".into(), "zulu".into()])
        );
        assert_eq!(runner.transport.requests.borrow().len(), 1);
    }

    #[test]
    fn apps_create_renders_confirmation() {
        let runner = Runner::new(FakeTransport::single(json!({
            "addApp": {"app": {"name": "demo"}, "error": ""}
        })));

        let outcome = runner.apps_create("demo").unwrap();

        assert_eq!(outcome.to_string(), "====> demo created!");
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn apps_create_surfaces_server_error() {
        let runner = Runner::new(FakeTransport::single(json!({
            "addApp": {"app": {"name": ""}, "error": "name taken"}
        })));

        let outcome = runner.apps_create("demo").unwrap();

        assert_eq!(outcome.to_string(), " !    name taken");
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn apps_create_rejects_empty_name_before_any_request() {
        let runner = Runner::new(FakeTransport::new(Vec::new()));

        assert!(runner.apps_create("").is_err());
        assert!(runner.transport.requests.borrow().is_empty());
    }

    #[test]
    fn apps_delete_renders_confirmation() {
        let runner = Runner::new(FakeTransport::single(json!({
            "deleteApp": {"ok": true, "error": ""}
        })));

        let outcome = runner.apps_delete("demo").unwrap();

        assert_eq!(outcome.to_string(), "====> demo deleted!");
    }

    #[test]
    fn app_exists_reports_match() {
        let runner = Runner::new(FakeTransport::single(json!({
            "apps": {"apps": [{"name": "demo"}]}
        })));

        let outcome = runner.app_exists("demo").unwrap();

        assert_eq!(outcome.to_string(), "demo exists");
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn app_exists_prints_hints_when_missing() {
        let runner = Runner::new(FakeTransport::single(json!({"apps": {"apps": []}})));

        let outcome = runner.app_exists("ghost").unwrap();

        assert_eq!(outcome.exit_code(), 1);
        let rendered = outcome.to_string();
        assert!(rendered.starts_with("ghost not found. Possible causes:"));
        assert!(rendered.contains("granted access"));
    }

    #[test]
    fn service_exists_requires_matching_type() {
        let services = json!({"services": [
            {"name": "foo", "serviceType": "redis", "created": "2020-01-01"}
        ]});

        let runner = Runner::new(FakeTransport::single(services.clone()));
        let outcome = runner.service_exists(ServiceType::Postgres, "foo").unwrap();
        assert_eq!(outcome.exit_code(), 1);
        assert!(outcome.to_string().contains("foo not found"));

        let runner = Runner::new(FakeTransport::single(services));
        let outcome = runner.service_exists(ServiceType::Redis, "foo").unwrap();
        assert_eq!(outcome, Outcome::Found("foo".into()));
    }

    #[test]
    fn service_list_filters_by_type_in_server_order() {
        let runner = Runner::new(FakeTransport::single(json!({"services": [
            {"name": "sessions", "serviceType": "redis"},
            {"name": "billing", "serviceType": "postgres"},
            {"name": "queue", "serviceType": "redis"},
        ]})));

        let outcome = runner.service_list(ServiceType::Redis).unwrap();

        assert_eq!(
            outcome,
            Outcome::Listing(vec!["sessions".into(), "queue".into()])
        );
    }

    #[test]
    fn service_mutations_bind_service_type_as_variable() {
        let runner = Runner::new(FakeTransport::single(json!({
            "addService": {"error": ""}
        })));

        runner.service_create(ServiceType::Redis, "sessions").unwrap();

        let requests = runner.transport.requests.borrow();
        assert_eq!(requests[0].variables["serviceType"], json!("redis"));
        assert_eq!(requests[0].variables["name"], json!("sessions"));
        assert!(requests[0].query.contains("$serviceType: ServiceType!"));
    }

    #[test]
    fn service_link_renders_app_name() {
        let runner = Runner::new(FakeTransport::single(json!({
            "linkService": {"ok": true, "error": ""}
        })));

        let outcome = runner
            .service_link(ServiceType::Postgres, "billing", "storefront")
            .unwrap();

        assert_eq!(outcome.to_string(), "====> storefront linked!");
        let requests = runner.transport.requests.borrow();
        assert_eq!(requests[0].variables["appname"], json!("storefront"));
        assert_eq!(requests[0].variables["serviceName"], json!("billing"));
    }

    #[test]
    fn service_unlink_renders_app_name() {
        let runner = Runner::new(FakeTransport::single(json!({
            "unlinkService": {"ok": true, "error": ""}
        })));

        let outcome = runner
            .service_unlink(ServiceType::Redis, "sessions", "storefront")
            .unwrap();

        assert_eq!(outcome.to_string(), "====> storefront unlinked!");
    }

    #[test]
    fn service_link_requires_app_before_any_request() {
        let runner = Runner::new(FakeTransport::new(Vec::new()));

        assert!(runner
            .service_link(ServiceType::Redis, "sessions", "")
            .is_err());
        assert!(runner.transport.requests.borrow().is_empty());
    }

    #[test]
    fn empty_listing_renders_nothing() {
        assert_eq!(Outcome::Listing(Vec::new()).to_string(), "");
    }
}
