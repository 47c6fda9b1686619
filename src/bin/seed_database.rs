//! Demo data seeder for the microbiology QC API.
//!
//! Creates a batch of draft forms through the public API, sends part of them to the
//! lab with a bacteria selection and records sensory results on some of those, so the
//! dashboards, reading calendar and alerts have something to show.
//!
//! Usage:
//!   `cargo run --bin seed_database -- --url http://localhost:3000 --token COORDINATOR_JWT --technician-token TECHNICIAN_JWT`
//!   `cargo run --bin seed_database -- --forms 12` (local deployment, identity headers)

use clap::{Arg, Command};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use std::time::Duration;

type SeedResult<T> = Result<T, Box<dyn std::error::Error>>;

const BRANDS: [&str; 4] = ["Grand Frais", "Carrefour", "Leclerc", "Auchan"];
const SITES: [&str; 3] = ["R1", "R2", "R3"];
const PRODUCTS: [&str; 8] = [
    "Fromage blanc 20%",
    "Fromage blanc 40%",
    "Yaourt nature",
    "Yaourt brassé vanille",
    "Crème fraîche épaisse",
    "Faisselle",
    "Petit suisse",
    "Lait fermenté",
];
/// One yeast/mold variant per panel; both write the same result field
const PANELS: [&[&str]; 4] = [
    &["Entérobactéries", "Levures/Moisissures (5j)"],
    &["Entérobactéries", "Escherichia coli", "Levures/Moisissures (3j)"],
    &["Listeria", "Staphylocoques", "Coliformes totaux"],
    &["Flore totales", "Leuconostoc", "Entérobactéries"],
];

/// Who the seeder acts as for a given request
#[derive(Debug, Clone, Copy)]
enum Acting {
    Coordinator,
    Technician,
}

impl Acting {
    fn role(self) -> &'static str {
        match self {
            Acting::Coordinator => "coordinator",
            Acting::Technician => "technician",
        }
    }
}

pub struct DatabaseSeeder {
    base_url: String,
    token: Option<String>,
    technician_token: Option<String>,
    client: Client,
    created: Vec<Value>,
}

impl DatabaseSeeder {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        technician_token: Option<String>,
    ) -> SeedResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            technician_token,
            client,
            created: Vec::new(),
        })
    }

    /// With a token, Keycloak decides the role; otherwise the identity headers do.
    fn authenticate(&self, request: RequestBuilder, acting: Acting) -> RequestBuilder {
        let token = match acting {
            Acting::Coordinator => self.token.as_ref(),
            Acting::Technician => self.technician_token.as_ref().or(self.token.as_ref()),
        };
        match token {
            Some(token) => request.bearer_auth(token),
            None => request
                .header("x-actor-name", format!("seed-{}", acting.role()))
                .header("x-actor-role", acting.role()),
        }
    }

    async fn request(
        &self,
        acting: Acting,
        method: reqwest::Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> SeedResult<Value> {
        let url = format!("{}{endpoint}", self.base_url);
        let mut request = self.authenticate(self.client.request(method, &url), acting);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response.json::<Value>().await?)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(format!("HTTP {status} {endpoint}: {error_text}").into())
        }
    }

    fn progress(len: usize) -> SeedResult<ProgressBar> {
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>4}/{len:4} {msg}",
                )?
                .progress_chars("##-"),
        );
        Ok(pb)
    }

    pub async fn check_connection(&self) -> SeedResult<()> {
        let health = self
            .request(Acting::Coordinator, reqwest::Method::GET, "/healthz", None)
            .await?;
        println!(
            "{} API is up (database: {})",
            style("✓").green(),
            health["status"].as_str().unwrap_or("unknown")
        );
        Ok(())
    }

    pub async fn create_forms(&mut self, count: usize) -> SeedResult<()> {
        println!("{} Creating draft forms...", style("[1/3]").bold().dim());
        let payloads = random_forms(count);
        let pb = Self::progress(payloads.len())?;

        for payload in payloads {
            pb.set_message(format!(
                "{} / {}",
                payload["brand"].as_str().unwrap_or_default(),
                payload["site"].as_str().unwrap_or_default()
            ));
            let form = self
                .request(
                    Acting::Coordinator,
                    reqwest::Method::POST,
                    "/api/forms",
                    Some(&payload),
                )
                .await?;
            self.created.push(form);
            pb.inc(1);
        }

        pb.finish_with_message("Drafts created");
        println!(
            "{} Created {} forms",
            style("✓").green(),
            self.created.len()
        );
        Ok(())
    }

    /// Send roughly two thirds of the drafts, each with one of the standard panels
    pub async fn send_forms(&mut self) -> SeedResult<()> {
        println!("{} Sending forms to the lab...", style("[2/3]").bold().dim());
        let keep_as_draft = self.created.len() / 3;
        let panels: Vec<&[&str]> = {
            let mut rng = rand::rng();
            (keep_as_draft..self.created.len())
                .map(|_| *PANELS.choose(&mut rng).unwrap_or(&PANELS[0]))
                .collect()
        };
        let pb = Self::progress(panels.len())?;

        for (index, panel) in (keep_as_draft..self.created.len()).zip(panels) {
            let id = self.created[index]["id"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let sent = self
                .request(
                    Acting::Coordinator,
                    reqwest::Method::POST,
                    &format!("/api/forms/{id}/send"),
                    Some(&json!({ "bacteria": panel })),
                )
                .await?;
            self.created[index] = sent;
            pb.inc(1);
        }

        pb.finish_with_message("Forms sent");
        Ok(())
    }

    /// Record complete sensory results on half of the sent forms
    pub async fn record_sensory(&self) -> SeedResult<()> {
        println!(
            "{} Recording sensory results...",
            style("[3/3]").bold().dim()
        );
        let sent: Vec<String> = self
            .created
            .iter()
            .filter(|form| form["status"] == "analyses_en_cours")
            .step_by(2)
            .filter_map(|form| form["id"].as_str().map(str::to_string))
            .collect();
        let pb = Self::progress(sent.len())?;

        for id in sent {
            let Some(form) = self.created.iter().find(|form| form["id"] == id.as_str()) else {
                continue;
            };
            let submission = sensory_submission(form);
            self.request(
                Acting::Technician,
                reqwest::Method::POST,
                &format!("/api/forms/{id}/sensory"),
                Some(&submission),
            )
            .await?;
            pb.inc(1);
        }

        pb.finish_with_message("Plates seeded");
        Ok(())
    }

    pub async fn seed_database(&mut self, forms: usize) -> SeedResult<()> {
        self.check_connection().await?;
        self.create_forms(forms).await?;
        self.send_forms().await?;
        self.record_sensory().await?;

        println!();
        println!("{}", style("Seeding complete").bold().green());
        println!(
            "Readings become due once each bacterium's incubation delay has elapsed; check {}",
            style(format!("{}/api/bacteria/calendar", self.base_url)).cyan()
        );
        Ok(())
    }
}

fn random_forms(count: usize) -> Vec<Value> {
    let mut rng = rand::rng();
    (0..count)
        .map(|index| {
            let brand = BRANDS.choose(&mut rng).copied().unwrap_or(BRANDS[0]);
            let site = SITES.choose(&mut rng).copied().unwrap_or(SITES[0]);
            let sample_count = rng.random_range(1..=5);
            let samples: Vec<Value> = (1..=sample_count)
                .map(|number| {
                    let hour = rng.random_range(6..=11);
                    let shelf_days = rng.random_range(14..=30);
                    let today = chrono::Utc::now().date_naive();
                    json!({
                        "number": number.to_string(),
                        "product": PRODUCTS.choose(&mut rng).copied().unwrap_or(PRODUCTS[0]),
                        "ready_time": format!("{hour:02}:{:02}", rng.random_range(0..4) * 15),
                        "fabrication": today.format("%Y-%m-%d").to_string(),
                        "dlc": (today + chrono::Duration::days(shelf_days)).format("%d-%m-%Y").to_string(),
                    })
                })
                .collect();
            json!({
                "report_title": format!("Contrôle {site} #{}", index + 1),
                "brand": brand,
                "site": site,
                "samples": samples,
            })
        })
        .collect()
}

/// Every live sample gets all four judgments and a pH, mostly conforming
fn sensory_submission(form: &Value) -> Value {
    let mut rng = rand::rng();
    let samples = form["samples"].as_array().map(Vec::as_slice).unwrap_or_default();
    let results: Vec<Value> = samples
        .iter()
        .filter(|sample| sample["status"] != "rejected")
        .map(|sample| {
            let mut judge = || if rng.random_bool(0.9) { "C" } else { "NC" };
            let (smell, texture, taste, aspect) = (judge(), judge(), judge(), judge());
            json!({
                "sample_id": sample["id"],
                "version": sample["version"],
                "smell": smell,
                "texture": texture,
                "taste": taste,
                "aspect": aspect,
                "ph": format!("{:.1}", rng.random_range(4.2..6.8)),
            })
        })
        .collect();
    json!({ "results": results })
}

#[tokio::main]
async fn main() -> SeedResult<()> {
    let matches = Command::new("MicroQC Database Seeder")
        .version("1.0")
        .about("Seeds the QC database with demo forms through the API")
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("API base URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new("token")
                .short('t')
                .long("token")
                .value_name("JWT_TOKEN")
                .help("JWT token; omit against a local deployment to use identity headers"),
        )
        .arg(
            Arg::new("technician-token")
                .long("technician-token")
                .value_name("JWT_TOKEN")
                .help("Token of a technician account, used for the sensory step"),
        )
        .arg(
            Arg::new("forms")
                .short('f')
                .long("forms")
                .value_name("COUNT")
                .help("Number of forms to create")
                .value_parser(clap::value_parser!(usize))
                .default_value("9"),
        )
        .get_matches();

    let base_url = matches
        .get_one::<String>("url")
        .cloned()
        .unwrap_or_else(|| "http://localhost:3000".to_string());
    let token = matches.get_one::<String>("token").cloned();
    let technician_token = matches.get_one::<String>("technician-token").cloned();
    let forms = matches.get_one::<usize>("forms").copied().unwrap_or(9);

    println!("{}", style("MicroQC Database Seeder v1.0").bold());
    println!("{}", style("━".repeat(40)).dim());
    println!("API URL: {}", style(&base_url).cyan());
    match &token {
        Some(token) => println!(
            "Token:   {}...{}",
            style("*".repeat(8)).dim(),
            style(&token[token.len().saturating_sub(8)..]).dim()
        ),
        None => println!("Auth:    {}", style("identity headers").yellow()),
    }

    let mut seeder = DatabaseSeeder::new(&base_url, token, technician_token)?;
    seeder.seed_database(forms).await?;
    Ok(())
}
