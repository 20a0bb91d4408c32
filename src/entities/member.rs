use chrono::{DateTime, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{invalid_field_error, invalid_input_error, invalid_invocation_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Driver,
    Admin,
    Agency,
}

impl Role {
    pub fn name(&self) -> String {
        match self {
            Self::Client => "client".into(),
            Self::Driver => "driver".into(),
            Self::Admin => "admin".into(),
            Self::Agency => "agency".into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Active,
    PendingVerification,
    Processing,
    Suspended,
    Rejected,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Active => "ACTIVE".into(),
            Self::PendingVerification => "PENDING_VERIFICATION".into(),
            Self::Processing => "PROCESSING".into(),
            Self::Suspended => "SUSPENDED".into(),
            Self::Rejected => "REJECTED".into(),
        }
    }

    pub fn can_login(&self) -> bool {
        !matches!(self, Self::Suspended | Self::Rejected)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub plate: String,
    pub vehicle_type: String,
    pub seats: u32,
}

impl Vehicle {
    pub fn describe(&self) -> String {
        format!("{} {} ({})", self.make, self.model, self.vehicle_type)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Licence,
    Insurance,
    Registration,
    Identity,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub url: String,
    pub status: DocumentStatus,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Profile {
    Client {
        balance: f64,
    },
    Agency {
        company: String,
        balance: f64,
    },
    Driver {
        vehicles: Vec<Vehicle>,
        documents: Vec<Document>,
        rating: Option<f64>,
        earnings: f64,
        paid_out: f64,
    },
    Admin,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub status: Status,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

/// The two money accounts a member can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Account {
    /// Client and agency balance.
    Balance,
    /// Unpaid driver earnings.
    Earnings,
}

/// A single change to a member's money, applied by the store in one step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum LedgerEntry {
    /// A negative amount reverses an earlier credit.
    Credit { account: Account, amount: f64 },
    PayOut,
}

impl PolarClass for Member {
    fn get_polar_class_builder() -> oso::ClassBuilder<Member> {
        oso::Class::builder()
            .name("Member")
            .add_attribute_getter("id", |recv: &Member| recv.id)
            .add_attribute_getter("role", |recv: &Member| recv.role.name())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Member::get_polar_class_builder();
        builder.build()
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Member {
    /// Builds a member from a registration; `password_hash` must already be
    /// derived from `registration.password`.
    pub fn new(registration: &Registration, password_hash: String) -> Result<Self, Error> {
        let email = normalize_email(&registration.email);

        if email.is_empty() || !email.contains('@') {
            return Err(invalid_field_error("email"));
        }

        if registration.name.trim().is_empty() {
            return Err(invalid_field_error("name"));
        }

        let (status, profile) = match registration.role {
            Role::Client => (Status::Active, Profile::Client { balance: 0.0 }),
            Role::Agency => {
                let company = registration
                    .company
                    .clone()
                    .filter(|company| !company.trim().is_empty())
                    .ok_or_else(|| invalid_field_error("company"))?;

                (
                    Status::Active,
                    Profile::Agency {
                        company,
                        balance: 0.0,
                    },
                )
            }
            Role::Driver => (
                Status::PendingVerification,
                Profile::Driver {
                    vehicles: vec![],
                    documents: vec![],
                    rating: None,
                    earnings: 0.0,
                    paid_out: 0.0,
                },
            ),
            Role::Admin => (Status::Active, Profile::Admin),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            email,
            name: registration.name.trim().to_string(),
            password_hash,
            role: registration.role,
            status,
            profile,
            created_at: Utc::now(),
            version: 0,
        })
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, Status::Active)
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn rating(&self) -> Option<f64> {
        match &self.profile {
            Profile::Driver { rating, .. } => *rating,
            _ => None,
        }
    }

    pub fn find_vehicle(&self, vehicle_id: Uuid) -> Option<&Vehicle> {
        match &self.profile {
            Profile::Driver { vehicles, .. } => vehicles.iter().find(|v| v.id == vehicle_id),
            _ => None,
        }
    }

    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> Result<(), Error> {
        if vehicle.make.trim().is_empty()
            || vehicle.model.trim().is_empty()
            || vehicle.plate.trim().is_empty()
            || vehicle.vehicle_type.trim().is_empty()
            || vehicle.seats == 0
        {
            return Err(invalid_input_error());
        }

        match &mut self.profile {
            Profile::Driver { vehicles, .. } => {
                if vehicles.iter().any(|v| v.plate == vehicle.plate) {
                    return Err(invalid_field_error("plate"));
                }

                vehicles.push(vehicle);
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    /// Registers a document for review. A driver who has not been looked at
    /// yet moves to PROCESSING.
    pub fn submit_document(&mut self, document: Document) -> Result<(), Error> {
        if document.url.trim().is_empty() {
            return Err(invalid_field_error("url"));
        }

        match &mut self.profile {
            Profile::Driver { documents, .. } => {
                documents.push(document);
            }
            _ => return Err(invalid_invocation_error()),
        }

        if self.status == Status::PendingVerification {
            self.status = Status::Processing;
        }

        Ok(())
    }

    pub fn review_document(&mut self, document_id: Uuid, approved: bool) -> Result<&Document, Error> {
        let documents = match &mut self.profile {
            Profile::Driver { documents, .. } => documents,
            _ => return Err(invalid_invocation_error()),
        };

        let document = documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(invalid_input_error)?;

        document.status = match approved {
            true => DocumentStatus::Approved,
            false => DocumentStatus::Rejected,
        };

        Ok(document)
    }

    /// Adds to a client or agency balance.
    pub fn credit_balance(&mut self, amount: f64) -> Result<(), Error> {
        match &mut self.profile {
            Profile::Client { balance } | Profile::Agency { balance, .. } => {
                *balance = round_cents(*balance + amount);
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    /// Adds to a driver's unpaid earnings.
    pub fn credit_earnings(&mut self, amount: f64) -> Result<(), Error> {
        match &mut self.profile {
            Profile::Driver { earnings, .. } => {
                *earnings = round_cents(*earnings + amount);
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    /// Moves all unpaid earnings to `paid_out` and returns the amount moved.
    /// Negative earnings, left by reversed jobs, stay owed.
    pub fn pay_out(&mut self) -> Result<f64, Error> {
        match &mut self.profile {
            Profile::Driver {
                earnings, paid_out, ..
            } => {
                let amount = earnings.max(0.0);
                *paid_out = round_cents(*paid_out + amount);
                *earnings = round_cents(*earnings - amount);
                Ok(amount)
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    pub fn holds(&self, account: Account) -> bool {
        matches!(
            (account, &self.profile),
            (Account::Balance, Profile::Client { .. })
                | (Account::Balance, Profile::Agency { .. })
                | (Account::Earnings, Profile::Driver { .. })
        )
    }

    /// Applies `entry` and returns the amount that moved.
    pub fn apply_ledger(&mut self, entry: LedgerEntry) -> Result<f64, Error> {
        match entry {
            LedgerEntry::Credit {
                account: Account::Balance,
                amount,
            } => self.credit_balance(amount).map(|_| amount),
            LedgerEntry::Credit {
                account: Account::Earnings,
                amount,
            } => self.credit_earnings(amount).map(|_| amount),
            LedgerEntry::PayOut => self.pay_out(),
        }
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(role: Role) -> Registration {
        Registration {
            email: " Driver@Example.com ".into(),
            name: "Ana".into(),
            password: "secret-password".into(),
            role,
            company: None,
        }
    }

    fn vehicle(plate: &str) -> Vehicle {
        Vehicle {
            id: Uuid::new_v4(),
            make: "Mercedes".into(),
            model: "V-Class".into(),
            plate: plate.into(),
            vehicle_type: "Van".into(),
            seats: 7,
        }
    }

    fn document() -> Document {
        Document {
            id: Uuid::new_v4(),
            kind: DocumentKind::Licence,
            url: "https://files.example.com/licence.pdf".into(),
            status: DocumentStatus::Pending,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn drivers_start_unverified_and_clients_active() {
        let driver = Member::new(&registration(Role::Driver), "hash".into()).unwrap();
        assert_eq!(driver.status, Status::PendingVerification);
        assert_eq!(driver.email, "driver@example.com");

        let client = Member::new(&registration(Role::Client), "hash".into()).unwrap();
        assert!(client.is_active());
    }

    #[test]
    fn agency_requires_company() {
        assert!(Member::new(&registration(Role::Agency), "hash".into()).is_err());

        let mut registration = registration(Role::Agency);
        registration.company = Some("Blue Line Travel".into());
        assert!(Member::new(&registration, "hash".into()).is_ok());
    }

    #[test]
    fn documents_move_driver_to_processing() {
        let mut driver = Member::new(&registration(Role::Driver), "hash".into()).unwrap();
        let document = document();
        let document_id = document.id;

        driver.submit_document(document).unwrap();
        assert_eq!(driver.status, Status::Processing);

        let reviewed = driver.review_document(document_id, true).unwrap();
        assert_eq!(reviewed.status, DocumentStatus::Approved);
        assert_eq!(driver.status, Status::Processing);
    }

    #[test]
    fn only_drivers_own_vehicles() {
        let mut client = Member::new(&registration(Role::Client), "hash".into()).unwrap();
        assert!(client.add_vehicle(vehicle("B-XY 123")).is_err());

        let mut driver = Member::new(&registration(Role::Driver), "hash".into()).unwrap();
        driver.add_vehicle(vehicle("B-XY 123")).unwrap();
        assert!(driver.add_vehicle(vehicle("B-XY 123")).is_err());
    }

    #[test]
    fn earnings_are_paid_out_once() {
        let mut driver = Member::new(&registration(Role::Driver), "hash".into()).unwrap();
        driver.credit_earnings(25.5).unwrap();
        driver.credit_earnings(10.25).unwrap();

        assert_eq!(driver.pay_out().unwrap(), 35.75);
        assert_eq!(driver.pay_out().unwrap(), 0.0);

        match driver.profile {
            Profile::Driver { paid_out, .. } => assert_eq!(paid_out, 35.75),
            _ => unreachable!(),
        }
    }

    #[test]
    fn ledger_entries_only_touch_held_accounts() {
        let mut driver = Member::new(&registration(Role::Driver), "hash".into()).unwrap();
        assert!(driver.holds(Account::Earnings));
        assert!(!driver.holds(Account::Balance));

        let credit = |amount| LedgerEntry::Credit {
            account: Account::Earnings,
            amount,
        };
        assert_eq!(driver.apply_ledger(credit(25.5)).unwrap(), 25.5);
        assert_eq!(driver.apply_ledger(credit(-40.0)).unwrap(), -40.0);
        assert_eq!(driver.apply_ledger(LedgerEntry::PayOut).unwrap(), 0.0);

        match &driver.profile {
            Profile::Driver {
                earnings, paid_out, ..
            } => assert_eq!((*earnings, *paid_out), (-14.5, 0.0)),
            _ => unreachable!(),
        }

        let balance = LedgerEntry::Credit {
            account: Account::Balance,
            amount: 10.0,
        };
        assert!(driver.apply_ledger(balance).is_err());

        let mut client = Member::new(&registration(Role::Client), "hash".into()).unwrap();
        assert_eq!(client.apply_ledger(balance).unwrap(), 10.0);
        assert!(client.apply_ledger(LedgerEntry::PayOut).is_err());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let client = Member::new(&registration(Role::Client), "argon-hash".into()).unwrap();
        let json = serde_json::to_string(&client).unwrap();

        assert!(!json.contains("argon-hash"));
    }
}
