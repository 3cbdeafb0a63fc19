// devis-pdf: Edit quotes and invoices and generate them as PDF

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use devis_pdf::clock::SystemClock;
use devis_pdf::config::{self, Paths};
use devis_pdf::error::Result;
use devis_pdf::model::{Client, Document, DocumentKind, LineItem};
use devis_pdf::money::{coerce_decimal, coerce_non_negative, coerce_quantity, format_currency};
use devis_pdf::profile::{self, CompanyProfile};
use devis_pdf::session::DocumentSession;
use devis_pdf::store::FileStore;
use devis_pdf::totals::{row_total, Totals};
use std::path::PathBuf;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Edit quotes and invoices and generate them as PDF")]
struct Cli {
    /// Which form to work on
    #[arg(short, long, value_enum, default_value = "quote", global = true)]
    kind: Kind,

    /// Directory holding saved forms and the company profile
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Quote,
    Invoice,
}

impl From<Kind> for DocumentKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Quote => DocumentKind::Quote,
            Kind::Invoice => DocumentKind::Invoice,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(flatten)]
    Edit(EditCommand),
    /// Write devis.pdf or facture.pdf
    Generate {
        /// Output directory (defaults to the current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Company profile (TOML); defaults to company.toml in the data directory
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Logo image (file path or URL), overrides the profile's logo
        #[arg(long)]
        logo: Option<String>,
    },
}

/// Commands that change (or print) the saved form.
#[derive(Subcommand, Debug)]
enum EditCommand {
    /// Print the current form with its totals
    Show,
    /// Update client fields
    Client(ClientArgs),
    /// Set the subject ("Objet")
    Subject { text: String },
    /// Append a line item
    AddItem(ItemArgs),
    /// Update the line item at a 1-based position
    SetItem {
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        index: u64,
        #[command(flatten)]
        item: ItemArgs,
    },
    /// Remove the line item at a 1-based position
    RemoveItem {
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        index: u64,
    },
    /// Manual total, VAT exemption and deposit
    Flags(FlagArgs),
    /// Start over with an empty form
    Reset,
}

#[derive(Args, Debug)]
struct ClientArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    email: Option<String>,
}

/// Numbers are taken as text; anything unparseable counts as 0.
#[derive(Args, Debug)]
struct ItemArgs {
    #[arg(long)]
    designation: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    quantity: Option<String>,
    #[arg(long)]
    price: Option<String>,
}

#[derive(Args, Debug)]
struct FlagArgs {
    /// Replace the computed HT total with this amount
    #[arg(long, conflicts_with = "no_manual_total")]
    manual_total: Option<String>,

    /// Go back to the computed HT total
    #[arg(long)]
    no_manual_total: bool,

    /// Omit VAT (true/false)
    #[arg(long, action = ArgAction::Set)]
    vat_exempt: Option<bool>,

    /// Deposit amount printed under the totals
    #[arg(long)]
    deposit: Option<String>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let kind = DocumentKind::from(cli.kind);
    let paths = Paths::resolve(cli.data_dir.as_deref());
    let store = FileStore::open(paths.store_dir())?;

    match cli.command {
        Command::Generate {
            output_dir,
            profile,
            logo,
        } => generate(&paths, &store, kind, output_dir, profile, logo),
        Command::Edit(command) => edit(store, kind, command),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// 1-based CLI position to a vector index.
fn position(index: u64) -> usize {
    usize::try_from(index).map(|i| i.saturating_sub(1)).unwrap_or(usize::MAX)
}

fn apply_client(client: &mut Client, args: ClientArgs) {
    if let Some(name) = args.name {
        client.name = name;
    }
    if let Some(address) = args.address {
        client.address = address;
    }
    if let Some(city) = args.city {
        client.city = city;
    }
    if let Some(phone) = args.phone {
        client.phone = phone;
    }
    if let Some(email) = args.email {
        client.email = email;
    }
}

fn apply_item(item: &mut LineItem, args: ItemArgs) {
    if let Some(designation) = args.designation {
        item.designation = designation;
    }
    if let Some(description) = args.description {
        // Shells make literal newlines awkward; accept "\n" as a line break.
        item.description = description.replace("\\n", "\n");
    }
    if let Some(quantity) = args.quantity {
        item.quantity = coerce_quantity(&quantity);
    }
    if let Some(price) = args.price {
        item.unit_price = coerce_non_negative(&price);
    }
}

// ============================================================================
// Commands
// ============================================================================

fn edit(store: FileStore, kind: DocumentKind, command: EditCommand) -> Result<()> {
    let clock = SystemClock;
    let mut session = DocumentSession::open(store, kind, &clock);
    match command {
        EditCommand::Show => {}
        EditCommand::Client(args) => session.update_client(|client| apply_client(client, args))?,
        EditCommand::Subject { text } => session.set_subject(text)?,
        EditCommand::AddItem(args) => {
            let mut item = LineItem::blank();
            apply_item(&mut item, args);
            let index = session.add_item(item)?;
            println!("✓ Added item {}", index + 1);
        }
        EditCommand::SetItem { index, item } => {
            session.update_item(position(index), |line| apply_item(line, item))?
        }
        EditCommand::RemoveItem { index } => {
            let removed = session.remove_item(position(index))?;
            println!("✓ Removed item {}: {}", index, removed.designation);
        }
        EditCommand::Flags(args) => session.update_flags(|flags| {
            if let Some(value) = args.manual_total {
                flags.manual_total_override = true;
                flags.manual_total_value = coerce_decimal(&value);
            }
            if args.no_manual_total {
                flags.manual_total_override = false;
            }
            if let Some(exempt) = args.vat_exempt {
                flags.vat_exempt = exempt;
            }
            if let Some(deposit) = args.deposit {
                flags.deposit_amount = coerce_non_negative(&deposit);
            }
        })?,
        EditCommand::Reset => {
            session.reset(&clock)?;
            println!("✓ Reset {}", kind);
        }
    }

    print_document(session.document());
    Ok(())
}

fn generate(
    paths: &Paths,
    store: &FileStore,
    kind: DocumentKind,
    output_dir: Option<PathBuf>,
    profile_path: Option<PathBuf>,
    logo: Option<String>,
) -> Result<()> {
    let company = match profile_path {
        Some(path) => CompanyProfile::load(&path)?,
        None => CompanyProfile::load_or_init(&paths.profile_path())?,
    };
    let logo = profile::load_logo(logo.as_deref().or(company.logo.as_deref()))?;
    let output_dir = config::output_dir(output_dir.as_deref());

    let path = devis_pdf::generate(store, kind, &company, logo.as_ref(), &SystemClock, &output_dir)?;

    println!("✓ Generated: {}", path.display());
    println!("  Kind: {}", kind.title());
    if logo.is_some() {
        println!("  Logo: included");
    }
    Ok(())
}

fn print_document(document: &Document) {
    let client = &document.client;
    println!("{} ({})", document.kind.title(), document.id);
    println!("  Client:  {}", client.name);
    if !client.address.is_empty() || !client.city.is_empty() {
        println!("           {} {}", client.address, client.city);
    }
    if !client.phone.is_empty() || !client.email.is_empty() {
        println!("           {} {}", client.phone, client.email);
    }
    println!("  Objet:   {}", document.subject);
    println!();

    for (i, item) in document.items.iter().enumerate() {
        println!(
            "  {:>2}. {:<40} {:>4} x {:>12} = {:>12}",
            i + 1,
            item.designation,
            item.quantity,
            format_currency(item.unit_price),
            format_currency(row_total(item))
        );
        for line in item.description.lines() {
            println!("      {}", line);
        }
    }
    println!();

    let totals = Totals::compute(document);
    let flags = &document.flags;
    if flags.manual_total_override {
        println!("  Total HT (manual): {}", format_currency(totals.total_ht));
    } else {
        println!("  Total HT:  {}", format_currency(totals.total_ht));
    }
    if flags.vat_exempt {
        println!("  TVA:       exempt");
    } else {
        println!("  TVA:       {}", format_currency(totals.vat));
    }
    println!("  Total TTC: {}", format_currency(totals.total_ttc));
    println!("  Acompte:   {}", format_currency(totals.deposit_due));

    for issue in document.validate() {
        println!("  ! {}", issue);
    }
}
