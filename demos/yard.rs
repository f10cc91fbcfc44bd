//! Walks two containers through a shipment: allotment, gate-in, on board,
//! gate-out and empty return, then prints each container's history.
//!
//! Reads its store location from the MOVEMENTS_* environment variables and
//! defaults to a temporary database.

use anyhow::Context;
use container_movements::{
    MovementService,
    catalog::{InventoryRecord, PartyRecord, PortRecord, ShipmentRecord},
    config::LedgerConfig,
    service::{LeasingPosition, MovementView},
    types::{InventoryId, JobRef, PartyId, PortId, ShipmentId},
};

const JOB: &str = "SHP-2024-0117";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = LedgerConfig::from_env().context("reading MOVEMENTS_* settings")?;
    if std::env::var("MOVEMENTS_DB_PATH").is_err() {
        config.temporary = true;
    }
    let service = MovementService::new(config.open()?);
    seed(&service)?;

    let containers = [InventoryId(1), InventoryId(2)];
    for inventory_id in containers {
        service.record_allotment(
            inventory_id,
            JobRef::Shipment(ShipmentId(1)),
            LeasingPosition {
                port_id: PortId(10),
                party_id: Some(PartyId(50)),
            },
            Some("released from lessor".into()),
        )?;
    }

    for status in ["EMPTY PICKED UP", "GATE-IN", "SOB", "GATE-OUT", "EMPTY RETURNED"] {
        service
            .apply_bulk_status(&containers, status, JOB, None)
            .with_context(|| format!("moving containers to {status}"))?;
    }

    for inventory_id in containers {
        println!("history of container {inventory_id}:");
        for view in service.container_history(inventory_id)? {
            print_row(&view);
        }
    }

    println!("current positions:");
    for view in service.list_latest_movements()? {
        print_row(&view);
    }
    Ok(())
}

fn print_row(view: &MovementView) {
    println!(
        "  {:<20} {:<16} {:<12} {:<20} {}",
        view.event.occurred_at.to_string(),
        view.event.status.to_string(),
        view.port_name.as_deref().unwrap_or("?"),
        view.party_name.as_deref().unwrap_or("-"),
        view.container_number.as_deref().unwrap_or("?"),
    );
}

fn seed(service: &MovementService) -> anyhow::Result<()> {
    let catalog = service.catalog();
    catalog.put_shipment(&ShipmentRecord {
        id: ShipmentId(1),
        job_number: JOB.into(),
        pol_port_id: Some(PortId(10)),
        pod_port_id: Some(PortId(20)),
        carrier_address_book_id: Some(PartyId(60)),
        empty_return_depot_address_book_id: Some(PartyId(70)),
    })?;
    for (id, number) in [(1, "MSKU7750312"), (2, "TCLU1180447")] {
        catalog.put_inventory(&InventoryRecord {
            id: InventoryId(id),
            container_number: number.into(),
        })?;
    }
    for (id, code, name) in [(10, "NLRTM", "Rotterdam"), (20, "SGSIN", "Singapore")] {
        catalog.put_port(&PortRecord {
            id: PortId(id),
            code: code.into(),
            name: name.into(),
        })?;
    }
    for (id, name) in [(50, "Maasvlakte Lessor Yard"), (60, "Blue Water Lines"), (70, "Jurong Empty Depot")] {
        catalog.put_party(&PartyRecord {
            id: PartyId(id),
            name: name.into(),
        })?;
    }
    Ok(())
}
