//! Initial schema: tag vocabulary, imports, artifacts and task records

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.create_table(
				Table::create()
					.table(Tags::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Tags::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Tags::Uuid).uuid().not_null().unique_key())
					.col(ColumnDef::new(Tags::CreatedAt).timestamp_with_time_zone().not_null())
					.col(ColumnDef::new(Tags::UpdatedAt).timestamp_with_time_zone().not_null())
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(TagsRelations::Table)
					.if_not_exists()
					.col(ColumnDef::new(TagsRelations::ParentId).integer().not_null())
					.col(ColumnDef::new(TagsRelations::ChildId).integer().not_null())
					.primary_key(
						Index::create()
							.col(TagsRelations::ParentId)
							.col(TagsRelations::ChildId),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_tags_relations_parent")
							.from(TagsRelations::Table, TagsRelations::ParentId)
							.to(Tags::Table, Tags::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_tags_relations_child")
							.from(TagsRelations::Table, TagsRelations::ChildId)
							.to(Tags::Table, Tags::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		// Reverse lookups for ancestor queries
		manager
			.create_index(
				Index::create()
					.name("idx_tags_relations_child")
					.table(TagsRelations::Table)
					.col(TagsRelations::ChildId)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(TagLabels::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(TagLabels::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(TagLabels::Uuid).uuid().not_null().unique_key())
					.col(ColumnDef::new(TagLabels::TagId).integer().not_null())
					.col(ColumnDef::new(TagLabels::Label).string().not_null())
					.col(ColumnDef::new(TagLabels::LabelKey).string().not_null())
					.col(
						ColumnDef::new(TagLabels::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(TagLabels::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_tag_labels_tag")
							.from(TagLabels::Table, TagLabels::TagId)
							.to(Tags::Table, Tags::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_tag_labels_tag_label_key")
					.table(TagLabels::Table)
					.col(TagLabels::TagId)
					.col(TagLabels::LabelKey)
					.unique()
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_tag_labels_label_key")
					.table(TagLabels::Table)
					.col(TagLabels::LabelKey)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Languages::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Languages::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Languages::Lang).string_len(2).not_null())
					.col(ColumnDef::new(Languages::Territory).string_len(2).null())
					.to_owned(),
			)
			.await?;

		// SQLite treats NULLs as distinct here, lookup-or-create covers the territory-less case
		manager
			.create_index(
				Index::create()
					.name("idx_languages_lang_territory")
					.table(Languages::Table)
					.col(Languages::Lang)
					.col(Languages::Territory)
					.unique()
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(TagLabelsLanguages::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(TagLabelsLanguages::TagLabelId)
							.integer()
							.not_null(),
					)
					.col(
						ColumnDef::new(TagLabelsLanguages::LanguageId)
							.integer()
							.not_null(),
					)
					.primary_key(
						Index::create()
							.col(TagLabelsLanguages::TagLabelId)
							.col(TagLabelsLanguages::LanguageId),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_tag_labels_languages_label")
							.from(TagLabelsLanguages::Table, TagLabelsLanguages::TagLabelId)
							.to(TagLabels::Table, TagLabels::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_tag_labels_languages_language")
							.from(TagLabelsLanguages::Table, TagLabelsLanguages::LanguageId)
							.to(Languages::Table, Languages::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Imports::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Imports::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Imports::Uuid).uuid().not_null().unique_key())
					.col(ColumnDef::new(Imports::Meta).json().not_null())
					.col(
						ColumnDef::new(Imports::Complete)
							.boolean()
							.not_null()
							.default(false),
					)
					.col(ColumnDef::new(Imports::CreatedAt).timestamp_with_time_zone().not_null())
					.col(ColumnDef::new(Imports::UpdatedAt).timestamp_with_time_zone().not_null())
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Artifacts::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Artifacts::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Artifacts::Uuid).uuid().not_null().unique_key())
					.col(ColumnDef::new(Artifacts::ImportId).integer().not_null())
					.col(ColumnDef::new(Artifacts::ContentType).string().not_null())
					.col(ColumnDef::new(Artifacts::Path).text().not_null().unique_key())
					.col(ColumnDef::new(Artifacts::SourceUri).text().null())
					.col(ColumnDef::new(Artifacts::FileName).string().null())
					.col(
						ColumnDef::new(Artifacts::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(Artifacts::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_artifacts_import")
							.from(Artifacts::Table, Artifacts::ImportId)
							.to(Imports::Table, Imports::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_artifacts_import_id")
					.table(Artifacts::Table)
					.col(Artifacts::ImportId)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(ArtifactTasks::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(ArtifactTasks::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(ArtifactTasks::Uuid).uuid().not_null().unique_key())
					.col(ColumnDef::new(ArtifactTasks::Name).string().not_null())
					.col(ColumnDef::new(ArtifactTasks::ArtifactId).integer().not_null())
					.col(
						ColumnDef::new(ArtifactTasks::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_artifact_tasks_artifact")
							.from(ArtifactTasks::Table, ArtifactTasks::ArtifactId)
							.to(Artifacts::Table, Artifacts::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_artifact_tasks_name_artifact")
					.table(ArtifactTasks::Table)
					.col(ArtifactTasks::Name)
					.col(ArtifactTasks::ArtifactId)
					.unique()
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(ImportTasks::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(ImportTasks::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(ImportTasks::Uuid).uuid().not_null().unique_key())
					.col(ColumnDef::new(ImportTasks::Name).string().not_null())
					.col(ColumnDef::new(ImportTasks::ImportId).integer().not_null())
					.col(
						ColumnDef::new(ImportTasks::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_import_tasks_import")
							.from(ImportTasks::Table, ImportTasks::ImportId)
							.to(Imports::Table, Imports::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_import_tasks_name_import")
					.table(ImportTasks::Table)
					.col(ImportTasks::Name)
					.col(ImportTasks::ImportId)
					.unique()
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		// Dependents first
		manager
			.drop_table(Table::drop().table(ImportTasks::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(ArtifactTasks::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Artifacts::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Imports::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(TagLabelsLanguages::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Languages::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(TagLabels::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(TagsRelations::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Tags::Table).to_owned())
			.await?;

		Ok(())
	}
}

#[derive(DeriveIden)]
enum Tags {
	Table,
	Id,
	Uuid,
	CreatedAt,
	UpdatedAt,
}

#[derive(DeriveIden)]
enum TagsRelations {
	Table,
	ParentId,
	ChildId,
}

#[derive(DeriveIden)]
enum TagLabels {
	Table,
	Id,
	Uuid,
	TagId,
	Label,
	LabelKey,
	CreatedAt,
	UpdatedAt,
}

#[derive(DeriveIden)]
enum Languages {
	Table,
	Id,
	Lang,
	Territory,
}

#[derive(DeriveIden)]
enum TagLabelsLanguages {
	Table,
	TagLabelId,
	LanguageId,
}

#[derive(DeriveIden)]
enum Imports {
	Table,
	Id,
	Uuid,
	Meta,
	Complete,
	CreatedAt,
	UpdatedAt,
}

#[derive(DeriveIden)]
enum Artifacts {
	Table,
	Id,
	Uuid,
	ImportId,
	ContentType,
	Path,
	SourceUri,
	FileName,
	CreatedAt,
	UpdatedAt,
}

#[derive(DeriveIden)]
enum ArtifactTasks {
	Table,
	Id,
	Uuid,
	Name,
	ArtifactId,
	CreatedAt,
}

#[derive(DeriveIden)]
enum ImportTasks {
	Table,
	Id,
	Uuid,
	Name,
	ImportId,
	CreatedAt,
}
