use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use opd_core::config::{bootstrap_admin_from_env_value, data_dir_from_env_value};
use opd_core::{
    ClinicService, CoreConfig, FollowUp, FollowUpId, Gender, NewFollowUp, Patient, PatientDetails,
    PatientId, Principal, Role, SystemClock, Timestamp,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "opd")]
#[command(about = "OPD clinic records CLI")]
struct Cli {
    /// Snapshot directory (defaults to OPD_DATA_DIR, then "clinic_data")
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Principal to act as (defaults to the anonymous principal)
    #[arg(long = "as", global = true)]
    caller: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patients
    List,
    /// Register a patient
    Register {
        name: String,
        age: u32,
        /// male, female or other
        gender: Gender,
        contact_number: String,
        address: String,
        /// Medical history entry (repeatable)
        #[arg(long = "history")]
        medical_history: Vec<String>,
    },
    /// Search patients by name
    SearchName { term: String },
    /// Search patients by contact number
    SearchContact { term: String },
    /// Show a patient's clinical history
    History { patient_id: u64 },
    /// Show a patient's prescriptions
    Prescriptions { patient_id: u64 },
    /// Show a patient's upcoming follow-ups
    Upcoming { patient_id: u64 },
    /// Schedule a follow-up
    Schedule {
        patient_id: u64,
        /// Appointment date (YYYY-MM-DD, midnight UTC)
        date: NaiveDate,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Mark a follow-up completed
    Complete { follow_up_id: u64 },
    /// Cancel a follow-up
    Cancel { follow_up_id: u64 },
    /// Assign an access role to a principal (admin only)
    AssignRole { principal: String, role: Role },
    /// Show the acting principal's role and profile
    Whoami,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'opd --help' for commands");
        return Ok(());
    };

    let data_dir = match cli.data_dir {
        Some(dir) => Some(dir),
        None => data_dir_from_env_value(std::env::var("OPD_DATA_DIR").ok()),
    };
    let cfg = CoreConfig::new(
        data_dir,
        bootstrap_admin_from_env_value(std::env::var("OPD_BOOTSTRAP_ADMIN").ok())?,
    )?;
    let service = ClinicService::open(&cfg, Arc::new(SystemClock))?;
    let caller = match cli.caller {
        Some(raw) => Principal::parse(raw)?,
        None => Principal::anonymous(),
    };

    match command {
        Commands::List => print_patients(&service.get_all_patients(&caller)?),
        Commands::Register {
            name,
            age,
            gender,
            contact_number,
            address,
            medical_history,
        } => {
            let details = PatientDetails {
                name,
                age,
                gender,
                contact_number,
                address,
                medical_history,
            };
            match service.register_patient(&caller, details) {
                Ok(id) => println!("Registered patient with ID: {}", id),
                Err(e) => eprintln!("Error registering patient: {}", e),
            }
        }
        Commands::SearchName { term } => {
            print_patients(&service.search_patients_by_name(&caller, &term)?)
        }
        Commands::SearchContact { term } => {
            print_patients(&service.search_patients_by_contact(&caller, &term)?)
        }
        Commands::History { patient_id } => {
            let visits = service.get_clinical_history(&caller, PatientId(patient_id))?;
            if visits.is_empty() {
                println!("No visits found.");
            }
            for visit in visits {
                println!(
                    "Visit {} on {}: {} (symptoms: {})",
                    visit.id,
                    format_date(visit.date),
                    visit.diagnosis,
                    visit.symptoms.join(", ")
                );
            }
        }
        Commands::Prescriptions { patient_id } => {
            let prescriptions = service.get_prescriptions_by_patient(&caller, PatientId(patient_id))?;
            if prescriptions.is_empty() {
                println!("No prescriptions found.");
            }
            for prescription in prescriptions {
                println!(
                    "Prescription {} for visit {} by {} on {}",
                    prescription.id,
                    prescription.visit_id,
                    prescription.doctor_name,
                    format_date(prescription.date)
                );
                for medicine in prescription.medicines {
                    println!(
                        "  - {} {} {} for {}",
                        medicine.name, medicine.dosage, medicine.frequency, medicine.duration
                    );
                }
            }
        }
        Commands::Upcoming { patient_id } => {
            print_follow_ups(&service.get_upcoming_follow_ups(&caller, PatientId(patient_id))?)
        }
        Commands::Schedule {
            patient_id,
            date,
            notes,
        } => {
            let appointment_date = midnight_utc(date)?;
            let new = NewFollowUp {
                patient_id: PatientId(patient_id),
                appointment_date,
                notes,
            };
            match service.schedule_follow_up(&caller, new) {
                Ok(id) => println!("Scheduled follow-up with ID: {}", id),
                Err(e) => eprintln!("Error scheduling follow-up: {}", e),
            }
        }
        Commands::Complete { follow_up_id } => {
            match service.mark_follow_up_completed(&caller, FollowUpId(follow_up_id)) {
                Ok(()) => println!("Completed follow-up {}", follow_up_id),
                Err(e) => eprintln!("Error completing follow-up: {}", e),
            }
        }
        Commands::Cancel { follow_up_id } => {
            match service.cancel_follow_up(&caller, FollowUpId(follow_up_id)) {
                Ok(()) => println!("Cancelled follow-up {}", follow_up_id),
                Err(e) => eprintln!("Error cancelling follow-up: {}", e),
            }
        }
        Commands::AssignRole { principal, role } => {
            let user = Principal::parse(principal)?;
            match service.assign_caller_user_role(&caller, &user, role) {
                Ok(()) => println!("Assigned role {} to {}", role, user),
                Err(e) => eprintln!("Error assigning role: {}", e),
            }
        }
        Commands::Whoami => {
            let role = service.get_caller_user_role(&caller)?;
            match service.get_caller_user_profile(&caller)? {
                Some(profile) => println!(
                    "{} ({}): {}, {}",
                    caller, role, profile.name, profile.job_title
                ),
                None => println!("{} ({}): no profile", caller, role),
            }
        }
    }

    Ok(())
}

fn print_patients(patients: &[Patient]) {
    if patients.is_empty() {
        println!("No patients found.");
        return;
    }
    for patient in patients {
        println!(
            "ID: {}, Name: {}, Age: {}, Gender: {}, Contact: {}",
            patient.id, patient.name, patient.age, patient.gender, patient.contact_number
        );
    }
}

fn print_follow_ups(follow_ups: &[FollowUp]) {
    if follow_ups.is_empty() {
        println!("No follow-ups found.");
        return;
    }
    for follow_up in follow_ups {
        println!(
            "Follow-up {} on {} [{}] {}",
            follow_up.id,
            format_date(follow_up.appointment_date),
            follow_up.status,
            follow_up.notes
        );
    }
}

fn format_date(nanos: Timestamp) -> String {
    Utc.timestamp_nanos(nanos).format("%Y-%m-%d %H:%M").to_string()
}

fn midnight_utc(date: NaiveDate) -> Result<Timestamp, Box<dyn std::error::Error>> {
    date.and_hms_opt(0, 0, 0)
        .and_then(|dt| dt.and_utc().timestamp_nanos_opt())
        .ok_or_else(|| format!("date {} is outside the supported range", date).into())
}
