mod support;

use assert_matches::assert_matches;
use support::TestWorkspace;
use support::builders::{CellVal, fill_table};
use workbook_search::tools::{self, CellContextParams, FetchResultParams, SearchParams};
use workbook_search::{InvalidInputError, NotFoundError};

fn roster(workspace: &TestWorkspace) -> std::path::PathBuf {
    workspace.create_workbook("roster.xlsx", |book| {
        let sheet = book.get_sheet_mut(&0).unwrap();
        fill_table(
            sheet,
            "A1",
            &["Name", "Team", "Score"],
            &[
                vec![CellVal::from("Ana"), CellVal::from("Red"), CellVal::Num(10.0)],
                vec![CellVal::from("Ben"), CellVal::from("Blue"), CellVal::Num(12.0)],
                vec![CellVal::from("Cy"), CellVal::from("Red"), CellVal::Num(9.0)],
                vec![CellVal::from("Di"), CellVal::from("Green"), CellVal::Num(15.0)],
                vec![CellVal::from("Ed"), CellVal::from("Blue"), CellVal::Num(7.0)],
            ],
        );
    })
}

fn context_params(path: &std::path::Path, sheet: &str, row: u32, col: u32) -> CellContextParams {
    CellContextParams {
        file_path: path.display().to_string(),
        sheet_name: sheet.to_string(),
        row,
        col,
        keyword: "blue".to_string(),
        context_rows: Some(1),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn context_grid_surrounds_the_target() {
    let workspace = TestWorkspace::new();
    let path = roster(&workspace);

    let response = tools::get_cell_context(workspace.app_state(), context_params(&path, "Sheet1", 3, 2))
        .await
        .expect("context");

    assert_eq!(response.file_name, "roster.xlsx");
    assert_eq!(response.target_cell.value, "Blue");
    assert_eq!(response.target_cell.keyword, "blue");
    assert_eq!((response.max_row, response.max_col), (6, 3));

    let rows: Vec<u32> = response.surrounding_rows.iter().map(|r| r[0].row).collect();
    assert_eq!(rows, vec![2, 3, 4]);
    assert!(response.surrounding_rows.iter().all(|r| r.len() == 3));

    let targets: Vec<(u32, u32)> = response
        .surrounding_rows
        .iter()
        .flatten()
        .filter(|cell| cell.is_target)
        .map(|cell| (cell.row, cell.col))
        .collect();
    assert_eq!(targets, vec![(3, 2)]);
    assert_eq!(response.surrounding_rows[1][2].value, "12");
}

#[tokio::test(flavor = "current_thread")]
async fn context_window_is_clamped_to_the_sheet() {
    let workspace = TestWorkspace::new();
    let path = roster(&workspace);

    let response = tools::get_cell_context(
        workspace.app_state(),
        CellContextParams {
            context_rows: Some(3),
            ..context_params(&path, "Sheet1", 1, 1)
        },
    )
    .await
    .expect("context");

    let rows: Vec<u32> = response.surrounding_rows.iter().map(|r| r[0].row).collect();
    assert_eq!(rows, vec![1, 2, 3, 4]);
    assert!(response.surrounding_rows[0].iter().all(|cell| cell.is_header));
    assert!(response.surrounding_rows[1].iter().all(|cell| !cell.is_header));
}

#[tokio::test(flavor = "current_thread")]
async fn context_reports_missing_sheet_and_file() {
    let workspace = TestWorkspace::new();
    let path = roster(&workspace);

    let err = tools::get_cell_context(workspace.app_state(), context_params(&path, "Nope", 2, 2))
        .await
        .unwrap_err();
    let not_found = err.downcast_ref::<NotFoundError>().expect("not found");
    assert_eq!(not_found.details()["available_sheets"][0], "Sheet1");

    let missing = workspace.path("missing.xlsx");
    let err = tools::get_cell_context(workspace.app_state(), context_params(&missing, "Sheet1", 2, 2))
        .await
        .unwrap_err();
    assert_matches!(err.downcast_ref::<NotFoundError>(), Some(_));

    let err = tools::get_cell_context(workspace.app_state(), context_params(&path, "Sheet1", 0, 2))
        .await
        .unwrap_err();
    let invalid = err.downcast_ref::<InvalidInputError>().expect("invalid input");
    assert_eq!(invalid.field(), Some("row"));
}

#[tokio::test(flavor = "current_thread")]
async fn fetch_finds_artifacts_by_name_and_fragment() {
    let workspace = TestWorkspace::new();
    let path = roster(&workspace);
    let state = workspace.app_state();

    let response = tools::search(
        state.clone(),
        SearchParams {
            workbook_paths: vec![path.display().to_string()],
            keywords: vec!["red".to_string()],
            ..SearchParams::default()
        },
    )
    .await
    .expect("search");
    let output = response.output_file.expect("artifact");

    for identifier in [
        output.clone(),
        format!("results/{output}"),
        format!("/results/{output}"),
        output.trim_end_matches(".xlsx").to_string(),
    ] {
        let artifact = tools::fetch_result_artifact(
            state.clone(),
            FetchResultParams {
                file_path: identifier.clone(),
            },
        )
        .await
        .unwrap_or_else(|e| panic!("fetch {identifier}: {e:#}"));
        assert_eq!(artifact.file_name, output);
        assert!(artifact.bytes.starts_with(b"PK"));
    }
}

#[tokio::test(flavor = "current_thread")]
async fn fetch_rejects_escapes_and_lists_available_files() {
    let workspace = TestWorkspace::new();
    workspace.create_file("secret.xlsx", b"not yours");
    let state = workspace.app_state();

    let err = tools::fetch_result_artifact(
        state.clone(),
        FetchResultParams {
            file_path: "../secret.xlsx".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err.downcast_ref::<InvalidInputError>(), Some(_));

    let err = tools::fetch_result_artifact(
        state.clone(),
        FetchResultParams {
            file_path: workspace.path("secret.xlsx").display().to_string(),
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err.downcast_ref::<InvalidInputError>(), Some(_));

    let err = tools::fetch_result_artifact(
        state,
        FetchResultParams {
            file_path: "search_results_19990101_000000.xlsx".to_string(),
        },
    )
    .await
    .unwrap_err();
    let not_found = err.downcast_ref::<NotFoundError>().expect("not found");
    assert_eq!(not_found.details()["available_files"], serde_json::json!([]));
}
