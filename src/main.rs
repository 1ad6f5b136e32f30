use actix_cors::Cors;
use actix_web::{delete, get, post, put, web, App, HttpResponse, HttpServer};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::ReplaceOptions, Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tripledger::balance::compute_balances;
use tripledger::currency::{normalize_to_home, RateTable};
use tripledger::error::LedgerError;
use tripledger::schemas::{ExchangeRate, Expense, NewExpense, Participant, Trip};
use tripledger::stats::compute_stats;

const DB_NAME: &str = "TripLedger";

fn trips(client: &Client) -> Collection<Trip> {
    client.database(DB_NAME).collection("Trips")
}

fn rates(client: &Client) -> Collection<ExchangeRate> {
    client.database(DB_NAME).collection("ExchangeRates")
}

async fn load_rate_table(client: &Client) -> Result<RateTable, mongodb::error::Error> {
    let cursor = rates(client).find(None, None).await?;
    let docs: Vec<ExchangeRate> = cursor.try_collect().await?;
    Ok(RateTable::from_rates(&docs))
}

fn engine_error_response(err: &LedgerError) -> HttpResponse {
    match err {
        LedgerError::InvalidAmount(_) => HttpResponse::BadRequest().body(err.to_string()),
        LedgerError::UnknownCurrency(_) | LedgerError::UnbalancedParticipantSet(_) => {
            HttpResponse::UnprocessableEntity().body(err.to_string())
        }
    }
}

#[derive(Deserialize, Serialize)]
struct NewTripJson {
    name: String,
    budget: i64,
    participants: Vec<Participant>,
}

#[derive(Deserialize, Serialize)]
struct BudgetJson {
    budget: i64,
}

#[derive(Deserialize, Serialize)]
struct RateJson {
    rate: f64,
}

#[derive(Deserialize, Serialize)]
struct TripSummaryJson {
    id: String,
    name: String,
    budget: i64,
    participants: Vec<Participant>,
    total_expenses: i64,
    remaining_budget: i64,
}

#[put("/trips/{id}")]
async fn add_trip(
    client: web::Data<Client>,
    id: web::Path<String>,
    json: web::Json<NewTripJson>,
) -> HttpResponse {
    let json = json.into_inner();
    if json.participants.len() != 2 {
        return engine_error_response(&LedgerError::UnbalancedParticipantSet(
            json.participants.len(),
        ));
    }
    if json.budget < 0 {
        return HttpResponse::BadRequest().body("budget must not be negative");
    }
    let id = id.into_inner();
    let trips = trips(&client);
    match trips.find_one(doc! { "id": &id }, None).await {
        Ok(Some(_)) => return HttpResponse::Conflict().body("Trip already exists"),
        Ok(None) => {}
        Err(err) => return HttpResponse::InternalServerError().body(err.to_string()),
    }
    let trip = Trip {
        id,
        name: json.name,
        budget: json.budget,
        participants: json.participants,
        expenses: vec![],
    };
    match trips.insert_one(&trip, None).await {
        Ok(_) => HttpResponse::Ok().body("Trip added"),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[get("/trips/{id}")]
async fn get_trip(client: web::Data<Client>, id: web::Path<String>) -> HttpResponse {
    match trips(&client).find_one(doc! { "id": id.into_inner() }, None).await {
        Ok(Some(trip)) => {
            let total_expenses = trip.total_expenses();
            HttpResponse::Ok().json(TripSummaryJson {
                id: trip.id,
                name: trip.name,
                budget: trip.budget,
                participants: trip.participants,
                total_expenses,
                remaining_budget: trip.budget - total_expenses,
            })
        }
        Ok(None) => HttpResponse::NotFound().body("Couldn't find the desired trip"),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[put("/trips/{id}/budget")]
async fn update_budget(
    client: web::Data<Client>,
    id: web::Path<String>,
    json: web::Json<BudgetJson>,
) -> HttpResponse {
    let budget = json.into_inner().budget;
    if budget < 0 {
        return HttpResponse::BadRequest().body("budget must not be negative");
    }
    match trips(&client)
        .update_one(
            doc! { "id": id.into_inner() },
            doc! { "$set": { "budget": budget } },
            None,
        )
        .await
    {
        Ok(result) if result.matched_count == 0 => {
            HttpResponse::NotFound().body("Couldn't find the desired trip")
        }
        Ok(_) => HttpResponse::Ok().body("Budget updated"),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[post("/trips/{id}/expenses")]
async fn add_expense(
    client: web::Data<Client>,
    id: web::Path<String>,
    json: web::Json<NewExpense>,
) -> HttpResponse {
    let id = id.into_inner();
    let new = json.into_inner();
    let trip = match trips(&client).find_one(doc! { "id": &id }, None).await {
        Ok(Some(trip)) => trip,
        Ok(None) => return HttpResponse::NotFound().body("Couldn't find the desired trip"),
        Err(err) => return HttpResponse::InternalServerError().body(err.to_string()),
    };
    if !trip.participants.iter().any(|p| p.id == new.payer) {
        return HttpResponse::UnprocessableEntity()
            .body(format!("payer \"{}\" is not a trip participant", new.payer));
    }
    let rate_table = match load_rate_table(&client).await {
        Ok(table) => table,
        Err(err) => return HttpResponse::InternalServerError().body(err.to_string()),
    };
    // The rate in effect right now is sealed into the record; later rate
    // changes never touch existing expenses.
    let amount_ils =
        match normalize_to_home(new.amount_original, &new.currency_original, &rate_table) {
            Ok(amount) => amount,
            Err(err) => {
                warn!(currency = %new.currency_original, %err, "rejected expense submission");
                return engine_error_response(&err);
            }
        };
    let expense = Expense::seal(new, amount_ils);
    let expense_bson = match bson::to_bson(&expense) {
        Ok(value) => value,
        Err(err) => return HttpResponse::InternalServerError().body(err.to_string()),
    };
    match trips(&client)
        .update_one(
            doc! { "id": &id },
            doc! { "$push": { "expenses": expense_bson } },
            None,
        )
        .await
    {
        Ok(_) => HttpResponse::Ok().json(expense),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[get("/trips/{id}/expenses")]
async fn list_expenses(client: web::Data<Client>, id: web::Path<String>) -> HttpResponse {
    match trips(&client).find_one(doc! { "id": id.into_inner() }, None).await {
        Ok(Some(trip)) => {
            let mut expenses = trip.expenses;
            expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            HttpResponse::Ok().json(expenses)
        }
        Ok(None) => HttpResponse::NotFound().body("Couldn't find the desired trip"),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[delete("/trips/{id}/expenses/{expense_id}")]
async fn delete_expense(
    client: web::Data<Client>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (id, expense_id) = path.into_inner();
    match trips(&client)
        .update_one(
            doc! { "id": id },
            doc! { "$pull": { "expenses": { "id": expense_id } } },
            None,
        )
        .await
    {
        Ok(result) if result.matched_count == 0 => {
            HttpResponse::NotFound().body("Couldn't find the desired trip")
        }
        Ok(result) if result.modified_count == 0 => {
            HttpResponse::NotFound().body("Couldn't find the desired expense")
        }
        Ok(_) => HttpResponse::Ok().body("Expense deleted"),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[get("/trips/{id}/balance")]
async fn get_balance(client: web::Data<Client>, id: web::Path<String>) -> HttpResponse {
    match trips(&client).find_one(doc! { "id": id.into_inner() }, None).await {
        Ok(Some(trip)) => {
            match compute_balances(&trip.participants, &trip.expenses, trip.budget) {
                Ok(snapshot) => {
                    for warning in &snapshot.warnings {
                        warn!(trip = %trip.id, ?warning, "balance computed with warning");
                    }
                    HttpResponse::Ok().json(snapshot)
                }
                Err(err) => engine_error_response(&err),
            }
        }
        Ok(None) => HttpResponse::NotFound().body("Couldn't find the desired trip"),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[get("/trips/{id}/stats")]
async fn get_stats(client: web::Data<Client>, id: web::Path<String>) -> HttpResponse {
    match trips(&client).find_one(doc! { "id": id.into_inner() }, None).await {
        Ok(Some(trip)) => HttpResponse::Ok().json(compute_stats(&trip.expenses)),
        Ok(None) => HttpResponse::NotFound().body("Couldn't find the desired trip"),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[put("/rates/{currency}")]
async fn put_rate(
    client: web::Data<Client>,
    currency: web::Path<String>,
    json: web::Json<RateJson>,
) -> HttpResponse {
    let rate = json.into_inner().rate;
    if !rate.is_finite() || rate <= 0.0 {
        return HttpResponse::BadRequest().body(format!("rate {rate} must be positive"));
    }
    let record = ExchangeRate {
        currency: currency.into_inner().to_ascii_uppercase(),
        rate,
        last_updated: Utc::now(),
    };
    let options = ReplaceOptions::builder().upsert(true).build();
    match rates(&client)
        .replace_one(doc! { "currency": &record.currency }, &record, options)
        .await
    {
        Ok(_) => {
            info!(currency = %record.currency, rate, "exchange rate updated");
            HttpResponse::Ok().json(record)
        }
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[get("/rates")]
async fn get_rates(client: web::Data<Client>) -> HttpResponse {
    let cursor = match rates(&client).find(None, None).await {
        Ok(cursor) => cursor,
        Err(err) => return HttpResponse::InternalServerError().body(err.to_string()),
    };
    match cursor.try_collect::<Vec<ExchangeRate>>().await {
        Ok(docs) => HttpResponse::Ok().json(docs),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let uri = std::env::var("MONGODB_URI").expect("You need to add the MONGODB_URI to the env");
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    info!(%bind_addr, "starting trip ledger");

    let client = Client::with_uri_str(uri).await.expect("failed to connect");
    info!("connected to the database");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(web::Data::new(client.clone()))
            .service(add_trip)
            .service(get_trip)
            .service(update_budget)
            .service(add_expense)
            .service(list_expenses)
            .service(delete_expense)
            .service(get_balance)
            .service(get_stats)
            .service(put_rate)
            .service(get_rates)
    })
    .bind(bind_addr)?
    .run()
    .await
}
