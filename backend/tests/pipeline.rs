use salesdb::{
    load_object, query_object, read_dataset, transform_load_query, transform_object, EngineConfig,
    FsObjectStore, LoadError, ObjectStore, PipelineError, QuerySpec, Store,
};
use std::path::Path;

const HEADER: &str = "Region,Country,Item Type,Sales Channel,Order Priority,Order Date,Order ID,Ship Date,Units Sold,Unit Price,Unit Cost,Total Revenue,Total Cost,Total Profit";

fn extract(rows: &[&str]) -> String {
    let mut text = format!("{}\n", HEADER);
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: FsObjectStore,
    config: EngineConfig,
}

impl Fixture {
    fn new(input: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default()
            .with_object_root(dir.path().join("objects"))
            .with_work_dir(dir.path().join("work"))
            .with_batch_size(2);
        let store = FsObjectStore::with_root(&config.object_root);
        store.put("sales", "input.csv", input.as_bytes()).unwrap();
        Self {
            _dir: dir,
            store,
            config,
        }
    }

    fn snapshot_count(&self) -> i64 {
        let bytes = self.store.get("sales", "sales.db").unwrap();
        let path = self.config.work_dir.join("check.db");
        std::fs::write(&path, bytes).unwrap();
        let count = Store::open(&path).unwrap().count_orders().unwrap();
        std::fs::remove_file(&path).unwrap();
        count
    }

    fn work_dir_is_clean(&self) -> bool {
        let work: &Path = &self.config.work_dir;
        !work.exists() || std::fs::read_dir(work).unwrap().next().is_none()
    }
}

#[test]
fn duplicate_order_end_to_end() {
    let fx = Fixture::new(&extract(&[
        "North America,US,Cereal,Online,H,1/1/2020,A,1/2/2020,5,20,18,100,90,10",
        "North America,US,Cereal,Online,L,1/5/2020,A,1/9/2020,5,20,18,100,90,10",
    ]));

    let output = transform_object(&fx.store, &fx.config, "sales", "input.csv").unwrap();
    assert_eq!(output.rows_written, 1);
    assert_eq!(output.duplicates_removed, 1);

    let written = fx.store.get("sales", "output.csv").unwrap();
    let dataset = read_dataset(written.as_slice()).unwrap();
    let header = dataset.header().unwrap();
    assert_eq!(header[14], "Order Processing Time");
    assert_eq!(header[15], "Gross Margin");

    let row = &dataset.data_rows()[0];
    assert_eq!(row[4], "High");
    assert_eq!(row[14], "1");
    assert_eq!(row[15], "10.00");
}

#[test]
fn load_counts_every_unique_order() {
    let rows: Vec<String> = (1..=5)
        .map(|i| format!("Europe,France,Fruits,Online,M,1/1/2020,{},1/11/2020,{},2,1,10,5,5", i, i))
        .collect();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let fx = Fixture::new(&extract(&rows));

    transform_object(&fx.store, &fx.config, "sales", "input.csv").unwrap();
    let load = load_object(&fx.store, &fx.config, "sales").unwrap();

    assert_eq!(load.summary.rows_inserted, 5);
    assert_eq!(load.summary.batches, 3);
    assert_eq!(fx.snapshot_count(), 5);
    assert!(fx.work_dir_is_clean());
}

#[test]
fn reload_is_a_conflict_and_store_is_unchanged() {
    let fx = Fixture::new(&extract(&[
        "Asia,Japan,Fruits,Offline,C,3/1/2021,1,3/4/2021,4,9.33,6.92,37.32,27.68,9.64",
        "Asia,Japan,Fruits,Offline,C,3/1/2021,2,3/4/2021,4,9.33,6.92,37.32,27.68,9.64",
    ]));
    transform_object(&fx.store, &fx.config, "sales", "input.csv").unwrap();
    load_object(&fx.store, &fx.config, "sales").unwrap();

    let err = load_object(&fx.store, &fx.config, "sales").unwrap_err();

    assert!(matches!(err, PipelineError::Load(LoadError::DuplicateOrder { .. })));
    assert_eq!(fx.snapshot_count(), 2);
    assert!(fx.work_dir_is_clean());
}

#[test]
fn query_sums_units_by_region() {
    let fx = Fixture::new(&extract(&[
        "US,US,Cereal,Online,H,1/1/2020,1,1/2/2020,10,2,1,20,10,10",
        "US,US,Cereal,Online,H,1/1/2020,2,1/2/2020,20,2,1,40,20,20",
        "EU,France,Cereal,Online,H,1/1/2020,3,1/2/2020,5,2,1,10,5,5",
    ]));
    transform_object(&fx.store, &fx.config, "sales", "input.csv").unwrap();
    load_object(&fx.store, &fx.config, "sales").unwrap();

    let spec = QuerySpec::new().filter("Region", "US").aggregate("SUM(UnitsSold)");
    let values = query_object(&fx.store, &fx.config, "sales", &spec)
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(values.len(), 1);
    assert_eq!(values["SUM(UnitsSold)"], 30.0);
}

#[test]
fn single_invocation_run() {
    let fx = Fixture::new(&extract(&[
        "US,US,Cereal,Online,H,1/1/2020,1,1/2/2020,10,2,1,20,10,10",
        "US,US,Cereal,Online,L,13/1/2020,2,1/2/2020,20,2,1,0,20,20",
    ]));
    let spec = QuerySpec::new()
        .filter("Region", "US")
        .filter("SalesChannel", "Online")
        .aggregate("COUNT(*)")
        .aggregate("SUM(TotalProfit)");

    let run = transform_load_query(&fx.store, &fx.config, "sales", "input.csv", &spec).unwrap();

    assert_eq!(run.transform.issues.len(), 1);
    assert_eq!(run.load.total_orders, 2);
    let values = run.query.into_result().unwrap();
    assert_eq!(values["COUNT(*)"], 2.0);
    assert_eq!(values["SUM(TotalProfit)"], 30.0);

    let order = {
        let bytes = fx.store.get("sales", "sales.db").unwrap();
        let path = fx.config.work_dir.join("inspect.db");
        std::fs::write(&path, bytes).unwrap();
        let order = Store::open(&path).unwrap().order("2").unwrap().unwrap();
        std::fs::remove_file(&path).unwrap();
        order
    };
    assert_eq!(order.order_priority, "Low");
    assert_eq!(order.order_processing_time, "");
    assert_eq!(order.gross_margin, "0.0");
}
